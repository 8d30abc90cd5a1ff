//! Live preview command-line driver.
//!
//! Resolves drafts against a schema snapshot file so preview behavior can be
//! inspected without a running CMS.

mod commands;
mod formatter;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use formatter::OutputFormat;
use livepreview_core::config::{DEFAULT_COLLECTION_TAG, DEFAULT_EXPANSION_DEPTH};
use livepreview_core::PreviewConfig;
use tracing_subscriber::EnvFilter;

/// Live preview draft resolver
#[derive(Parser, Debug)]
#[command(name = "livepreview")]
#[command(version, about = "Resolve live-preview drafts against a schema snapshot")]
pub struct Args {
    /// Output format
    #[arg(long, global = true, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Log engine decisions at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Depth of related fields expanded when fetching items
    #[arg(long, global = true, default_value_t = DEFAULT_EXPANSION_DEPTH)]
    pub expansion_depth: u8,

    /// Key tagging many-to-any items with their collection
    #[arg(long, global = true, default_value = DEFAULT_COLLECTION_TAG)]
    pub collection_tag: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the relational field paths reachable from a collection
    Paths {
        /// Schema snapshot (relations, fields, items) as JSON
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Root collection
        #[arg(short, long)]
        collection: String,

        /// Field names to skip
        #[arg(long = "ignore")]
        ignored: Vec<String>,
    },

    /// Merge a pending draft into an item
    Preview {
        /// Schema snapshot (relations, fields, items) as JSON
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Collection of the item
        #[arg(short, long)]
        collection: String,

        /// Current item as JSON
        #[arg(long)]
        item: PathBuf,

        /// Form values before editing
        #[arg(long)]
        old: PathBuf,

        /// Form values now
        #[arg(long)]
        new: PathBuf,
    },

    /// Show the differences between two JSON documents
    Diff {
        /// Left-hand document
        left: PathBuf,

        /// Right-hand document; its pending deltas are listed too
        right: PathBuf,
    },
}

impl From<&Args> for PreviewConfig {
    fn from(args: &Args) -> Self {
        let config = PreviewConfig::new()
            .with_expansion_depth(args.expansion_depth)
            .with_collection_tag(&args.collection_tag);

        match &args.command {
            Command::Paths { ignored, .. } => ignored
                .iter()
                .fold(config, |config, field| config.with_ignored_field(field)),
            _ => config,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_tracing(args.verbose);

    if let Err(e) = commands::run(&args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "livepreview=debug,livepreview_core=debug"
    } else {
        "livepreview=info,livepreview_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_config_from_args() {
        let args = Args::parse_from([
            "livepreview",
            "--expansion-depth",
            "2",
            "paths",
            "--snapshot",
            "schema.json",
            "--collection",
            "posts",
            "--ignore",
            "user_created",
            "--ignore",
            "user_updated",
        ]);

        let config = PreviewConfig::from(&args);

        assert_eq!(config.expansion_depth, 2);
        assert_eq!(config.collection_tag, "__typename");
        assert!(config.is_ignored("user_created"));
        assert!(config.is_ignored("user_updated"));
        assert!(!config.is_ignored("author"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["livepreview", "diff", "a.json", "b.json", "--format", "json"]);

        assert_eq!(args.format, OutputFormat::Json);
        assert!(matches!(args.command, Command::Diff { .. }));
        assert_eq!(PreviewConfig::from(&args), PreviewConfig::default());
    }
}
