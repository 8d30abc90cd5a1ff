//! Subcommand execution.

use std::path::Path;

use anyhow::{bail, Context, Result};
use livepreview_core::{
    find_delta_paths, find_differences, CancelToken, DraftMergeEngine, FieldPathWalker, Item,
    MemoryGateway, PreviewConfig, RelationCatalog,
};
use serde_json::Value;

use crate::formatter::create_formatter;
use crate::{Args, Command};

/// Run the parsed command and print its output.
pub async fn run(args: &Args) -> Result<()> {
    let config = PreviewConfig::from(args);
    let formatter = create_formatter(args.format);

    let output = match &args.command {
        Command::Paths {
            snapshot,
            collection,
            ..
        } => {
            let gateway = load_snapshot(snapshot)?;
            let catalog = RelationCatalog::load(&gateway).await;

            let outcome = FieldPathWalker::new(&gateway, &catalog)
                .with_config(config)
                .with_cancel_token(cancel_on_ctrl_c())
                .walk(collection)
                .await
                .with_context(|| format!("walking fields of {}", collection))?;

            formatter.format_paths(&outcome.paths, &outcome.diagnostics)
        }
        Command::Preview {
            snapshot,
            collection,
            item,
            old,
            new,
        } => {
            let gateway = load_snapshot(snapshot)?;
            let catalog = RelationCatalog::load(&gateway).await;
            let item = read_object(item)?;
            let old_form = read_object(old)?;
            let new_form = read_object(new)?;

            let outcome = DraftMergeEngine::new(&gateway, &catalog)
                .with_config(config)
                .with_cancel_token(cancel_on_ctrl_c())
                .merge(collection, &item, &old_form, &new_form)
                .await
                .with_context(|| format!("merging draft into {}", collection))?;

            formatter.format_preview(&outcome.item, &outcome.diagnostics)
        }
        Command::Diff { left, right } => {
            let left = read_json(left)?;
            let right = read_json(right)?;

            formatter.format_diff(&find_differences(&left, &right), &find_delta_paths(&right))
        }
    };

    println!("{}", output);
    Ok(())
}

/// Cancel the returned token on Ctrl-C.
fn cancel_on_ctrl_c() -> CancelToken {
    let token = CancelToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling");
            handle.cancel();
        }
    });
    token
}

fn load_snapshot(path: &Path) -> Result<MemoryGateway> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    let gateway = MemoryGateway::from_json(&text)
        .with_context(|| format!("parsing snapshot {}", path.display()))?;
    tracing::debug!(path = %path.display(), "snapshot loaded");
    Ok(gateway)
}

fn read_json(path: &Path) -> Result<Value> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn read_object(path: &Path) -> Result<Item> {
    match read_json(path)? {
        Value::Object(item) => Ok(item),
        other => bail!(
            "{} must hold a JSON object, found {}",
            path.display(),
            type_name(&other)
        ),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
