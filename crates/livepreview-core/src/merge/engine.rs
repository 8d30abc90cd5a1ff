//! Draft merge engine.
//!
//! Resolves an item's fields against a pending draft, one relation kind at a
//! time:
//! - plain fields take the submitted value
//! - many-to-one fields resolve to the referenced item (fetched) or the
//!   inline unsaved item
//! - one-to-many fields apply create/update/delete to the row list
//! - many-to-any fields do the same over `{sort, item}` envelopes, recursing
//!   into nested drafts of the updated items
//!
//! Fetch failures never abort the pass: the field keeps its previous value
//! and a [`Diagnostic`](crate::diagnostics::Diagnostic) is recorded.

use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};

use super::delta::{ManyToOneValue, RelationDelta};
use crate::cancel::CancelToken;
use crate::catalog::{classify, FieldDescriptor, Relation, RelationCatalog, RelationKind};
use crate::config::PreviewConfig;
use crate::diagnostics::{join_path, Diagnostics};
use crate::error::{Error, Result};
use crate::gateway::{FieldCache, SchemaGateway};
use crate::value::{row_id, sort_rows, Item, ItemId};

/// Junction key of a many-to-any row naming the related collection.
const DEFAULT_COLLECTION_KEY: &str = "collection";

/// Resolved item and the failures that degraded it.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub item: Item,
    pub diagnostics: Diagnostics,
}

/// State of one merge pass.
#[derive(Default)]
struct Pass {
    fields: FieldCache,
    diagnostics: Diagnostics,
}

/// One field being resolved.
struct FieldContext<'f> {
    path: String,
    name: &'f str,
    descriptor: &'f FieldDescriptor,
    relation: Option<&'f Relation>,
    /// Value currently on the item.
    current: &'f Value,
    /// Value in the form before editing.
    previous: Option<&'f Value>,
    /// Value in the form now.
    submitted: Option<&'f Value>,
}

impl FieldContext<'_> {
    fn invalid(&self, reason: impl Into<String>) -> Error {
        Error::InvalidDelta {
            field: self.name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Keys of a many-to-any junction row.
struct EnvelopeKeys {
    junction: String,
    item: String,
    collection: String,
}

/// Merges pending drafts into items without persisting anything.
pub struct DraftMergeEngine<'a> {
    gateway: &'a dyn SchemaGateway,
    catalog: &'a RelationCatalog,
    config: PreviewConfig,
    cancel: CancelToken,
}

impl<'a> DraftMergeEngine<'a> {
    /// Create an engine with the default configuration.
    pub fn new(gateway: &'a dyn SchemaGateway, catalog: &'a RelationCatalog) -> Self {
        Self {
            gateway,
            catalog,
            config: PreviewConfig::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: PreviewConfig) -> Self {
        self.config = config;
        self
    }

    /// Stop passes once `token` is cancelled.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Merge `new_form` into `old_item` and return the resolved item.
    ///
    /// Only fields present on `old_item` are resolved; fields the schema does
    /// not describe are passed through untouched. Fails only when the root
    /// collection's fields cannot be listed or the pass is cancelled.
    pub async fn merge(
        &self,
        collection: &str,
        old_item: &Item,
        old_form: &Item,
        new_form: &Item,
    ) -> Result<MergeOutcome> {
        let mut pass = Pass::default();

        self.cancel.check()?;
        let fields = pass
            .fields
            .get(self.gateway, collection)
            .await
            .map_err(|source| Error::SchemaFetch {
                collection: collection.to_string(),
                source,
            })?;

        let item = self
            .merge_fields(collection, "", old_item, old_form, new_form, &fields, &mut pass)
            .await?;

        tracing::debug!(
            collection,
            diagnostics = pass.diagnostics.len(),
            "draft merged"
        );
        Ok(MergeOutcome {
            item,
            diagnostics: pass.diagnostics,
        })
    }

    /// Merge in place: resolved fields are written back into `item`.
    ///
    /// This is the only operation that mutates caller-owned data; hosts that
    /// hold the preview item in shared state use it to avoid a copy-back.
    pub async fn apply(
        &self,
        collection: &str,
        item: &mut Item,
        old_form: &Item,
        new_form: &Item,
    ) -> Result<Diagnostics> {
        let outcome = self.merge(collection, item, old_form, new_form).await?;
        *item = outcome.item;
        Ok(outcome.diagnostics)
    }

    #[allow(clippy::too_many_arguments)]
    async fn merge_fields(
        &self,
        collection: &str,
        prefix: &str,
        item: &Item,
        old_form: &Item,
        new_form: &Item,
        fields: &[FieldDescriptor],
        pass: &mut Pass,
    ) -> Result<Item> {
        let mut resolved = item.clone();

        for (name, current) in item {
            self.cancel.check()?;

            let Some(descriptor) = fields.iter().find(|f| &f.field == name) else {
                continue;
            };

            let relations = self.catalog.relations_for_field(collection, name);
            let classification = classify(&relations, collection, name);
            tracing::debug!(
                collection,
                field = %name,
                kind = %classification.kind,
                "resolving field"
            );

            let field = FieldContext {
                path: join_path(prefix, name),
                name,
                descriptor,
                relation: classification.relation,
                current,
                previous: old_form.get(name),
                submitted: new_form.get(name),
            };

            let value = match (classification.kind, classification.relation) {
                (RelationKind::ManyToOne, _) => self.resolve_many_to_one(&field, pass).await?,
                (RelationKind::OneToMany, _) => self.resolve_one_to_many(&field, pass),
                (RelationKind::ManyToAny, Some(relation)) => {
                    self.resolve_many_to_any(&field, relation, pass).await?
                }
                _ => resolve_plain(&field),
            };
            resolved.insert(name.clone(), value);
        }

        Ok(resolved)
    }

    /// Merge a nested draft into an item of another collection.
    ///
    /// Fields on `existing` are resolved as usual; submitted keys the
    /// existing item lacks are added verbatim. Returns `None` when the
    /// collection's fields cannot be listed; the caller keeps the existing
    /// item.
    fn merge_nested<'b>(
        &'b self,
        collection: &'b str,
        prefix: &'b str,
        existing: &'b Item,
        submitted: &'b Item,
        pass: &'b mut Pass,
    ) -> BoxFuture<'b, Result<Option<Item>>> {
        async move {
            self.cancel.check()?;
            let fields = match pass.fields.get(self.gateway, collection).await {
                Ok(fields) => fields,
                Err(source) => {
                    pass.diagnostics.push(
                        prefix,
                        Error::SchemaFetch {
                            collection: collection.to_string(),
                            source,
                        },
                    );
                    return Ok(None);
                }
            };

            let mut item = self
                .merge_fields(collection, prefix, existing, existing, submitted, &fields, pass)
                .await?;
            for (key, value) in submitted {
                if !item.contains_key(key) {
                    item.insert(key.clone(), value.clone());
                }
            }
            Ok(Some(item))
        }
        .boxed()
    }

    async fn resolve_many_to_one(&self, field: &FieldContext<'_>, pass: &mut Pass) -> Result<Value> {
        // Unset values show up transiently for drafts created and then
        // abandoned; keep what is there.
        let Some(submitted) = ManyToOneValue::from_form(field.submitted) else {
            return Ok(field.current.clone());
        };

        if field.submitted == field.previous {
            return Ok(field.current.clone());
        }

        let id = match submitted {
            ManyToOneValue::Inline(item) => return Ok(Value::Object(item)),
            ManyToOneValue::Ref(id) => id,
        };

        let target = field
            .descriptor
            .relation_hint
            .as_deref()
            .or_else(|| field.relation.and_then(|r| r.related_collection.as_deref()));
        let Some(target) = target else {
            pass.diagnostics
                .push(field.path.clone(), field.invalid("no related collection"));
            return Ok(field.current.clone());
        };

        self.cancel.check()?;
        match self
            .gateway
            .fetch_item(target, &id, self.config.expansion_depth)
            .await
        {
            Ok(item) => Ok(Value::Object(item)),
            Err(source) => {
                pass.diagnostics.push(
                    field.path.clone(),
                    Error::ItemFetch {
                        collection: target.to_string(),
                        id,
                        source,
                    },
                );
                Ok(field.current.clone())
            }
        }
    }

    fn resolve_one_to_many(&self, field: &FieldContext<'_>, pass: &mut Pass) -> Value {
        let Some(mut rows) = self.current_rows(field, pass) else {
            return field.current.clone();
        };
        let id_field = self.config.id_field.as_str();

        let delta = match RelationDelta::from_form(field.submitted) {
            Ok(Some(delta)) => delta,
            Ok(None) => {
                // Rows added and then removed before saving leave no delta
                // behind; only the persisted rows remain.
                rows.retain(|row| row_id(row, id_field).is_some());
                return Value::Array(rows);
            }
            Err(reason) => {
                pass.diagnostics.push(field.path.clone(), field.invalid(reason));
                return Value::Array(rows);
            }
        };

        rows.extend(delta.create.iter().cloned());

        for update in &delta.update {
            let Some(patch) = update.as_object() else {
                pass.diagnostics
                    .push(field.path.clone(), field.invalid("update entry is not an object"));
                continue;
            };
            let Some(id) = patch.get(id_field).and_then(ItemId::from_value) else {
                pass.diagnostics
                    .push(field.path.clone(), field.invalid("update entry has no id"));
                continue;
            };
            let Some(index) = rows.iter().position(|row| row_id(row, id_field).as_ref() == Some(&id))
            else {
                pass.diagnostics
                    .push(field.path.clone(), field.invalid(format!("no row with id {}", id)));
                continue;
            };

            let merged = self.patch_row(&rows[index], patch);
            rows[index] = Value::Object(merged);
        }

        for id in &delta.delete {
            match rows.iter().position(|row| row_id(row, id_field).as_ref() == Some(id)) {
                Some(index) => {
                    rows.remove(index);
                }
                None => pass
                    .diagnostics
                    .push(field.path.clone(), field.invalid(format!("no row with id {}", id))),
            }
        }

        sort_rows(&mut rows, &self.config.sort_field);
        Value::Array(rows)
    }

    async fn resolve_many_to_any(
        &self,
        field: &FieldContext<'_>,
        relation: &Relation,
        pass: &mut Pass,
    ) -> Result<Value> {
        let Some(mut rows) = self.current_rows(field, pass) else {
            return Ok(field.current.clone());
        };
        let keys = envelope_keys(relation);

        let delta = match RelationDelta::from_form(field.submitted) {
            Ok(Some(delta)) => delta,
            Ok(None) => {
                rows.retain(|row| self.envelope_item_id(row, &keys).is_some());
                return Ok(Value::Array(rows));
            }
            Err(reason) => {
                pass.diagnostics.push(field.path.clone(), field.invalid(reason));
                return Ok(Value::Array(rows));
            }
        };

        for addition in &delta.create {
            if let Some(envelope) = self.attach_any(field, &keys, addition, pass).await? {
                rows.push(envelope);
            }
        }

        for update in &delta.update {
            self.update_any(field, &keys, &mut rows, update, pass).await?;
        }

        for junction_id in &delta.delete {
            self.detach_any(field, &keys, &mut rows, junction_id, pass)
                .await?;
        }

        sort_rows(&mut rows, &self.config.sort_field);
        Ok(Value::Array(rows))
    }

    /// Build the envelope for a created many-to-any entry.
    async fn attach_any(
        &self,
        field: &FieldContext<'_>,
        keys: &EnvelopeKeys,
        addition: &Value,
        pass: &mut Pass,
    ) -> Result<Option<Value>> {
        let Some(envelope) = addition.as_object() else {
            pass.diagnostics
                .push(field.path.clone(), field.invalid("create entry is not an object"));
            return Ok(None);
        };
        let Some(target) = envelope.get(&keys.collection).and_then(Value::as_str) else {
            pass.diagnostics
                .push(field.path.clone(), field.invalid("create entry names no collection"));
            return Ok(None);
        };
        let submitted = envelope.get(&keys.item).cloned().unwrap_or(Value::Null);

        let item = match row_id(&submitted, &self.config.id_field) {
            // Attaching an existing item.
            Some(id) => {
                self.cancel.check()?;
                match self
                    .gateway
                    .fetch_item(target, &id, self.config.expansion_depth)
                    .await
                {
                    Ok(item) => item,
                    Err(source) => {
                        pass.diagnostics.push(
                            field.path.clone(),
                            Error::ItemFetch {
                                collection: target.to_string(),
                                id,
                                source,
                            },
                        );
                        self.inline_item(submitted)
                    }
                }
            }
            // Creating a new item.
            None => match submitted {
                Value::Object(item) => item,
                _ => {
                    pass.diagnostics
                        .push(field.path.clone(), field.invalid("create entry has no item"));
                    return Ok(None);
                }
            },
        };

        let mut envelope = envelope.clone();
        envelope.insert(keys.item.clone(), Value::Object(self.tag(target, item)));
        Ok(Some(Value::Object(envelope)))
    }

    /// Apply one update entry to the matching many-to-any envelope.
    async fn update_any(
        &self,
        field: &FieldContext<'_>,
        keys: &EnvelopeKeys,
        rows: &mut [Value],
        update: &Value,
        pass: &mut Pass,
    ) -> Result<()> {
        let id_field = self.config.id_field.as_str();

        let Some(patch) = update.as_object() else {
            pass.diagnostics
                .push(field.path.clone(), field.invalid("update entry is not an object"));
            return Ok(());
        };
        let Some(submitted) = patch.get(&keys.item).and_then(Value::as_object) else {
            pass.diagnostics
                .push(field.path.clone(), field.invalid("update entry has no item"));
            return Ok(());
        };
        let Some(id) = submitted.get(id_field).and_then(ItemId::from_value) else {
            pass.diagnostics
                .push(field.path.clone(), field.invalid("update entry item has no id"));
            return Ok(());
        };
        let Some(index) = rows
            .iter()
            .position(|row| self.envelope_item_id(row, keys).as_ref() == Some(&id))
        else {
            pass.diagnostics
                .push(field.path.clone(), field.invalid(format!("no entry for item {}", id)));
            return Ok(());
        };

        let existing = rows[index].clone();
        // An unexpanded item is just its id.
        let existing_item = match existing.get(&keys.item) {
            Some(Value::Object(item)) => item.clone(),
            None | Some(Value::Null) => Map::new(),
            Some(id) => self.inline_item(id.clone()),
        };

        let target = patch
            .get(&keys.collection)
            .and_then(Value::as_str)
            .or_else(|| existing.get(&keys.collection).and_then(Value::as_str))
            .or_else(|| {
                existing_item
                    .get(&self.config.collection_tag)
                    .and_then(Value::as_str)
            })
            .map(str::to_string);

        let item_path = join_path(&field.path, &keys.item);
        let merged = match target {
            Some(target) => self
                .merge_nested(&target, &item_path, &existing_item, submitted, pass)
                .await?
                .unwrap_or_else(|| existing_item.clone()),
            None => {
                pass.diagnostics.push(
                    item_path,
                    field.invalid(format!("collection of item {} is unknown", id)),
                );
                existing_item.clone()
            }
        };

        let mut envelope = self.patch_row(&existing, patch);
        envelope.insert(keys.item.clone(), Value::Object(merged));
        rows[index] = Value::Object(envelope);
        Ok(())
    }

    /// Remove the envelope behind a junction row id.
    async fn detach_any(
        &self,
        field: &FieldContext<'_>,
        keys: &EnvelopeKeys,
        rows: &mut Vec<Value>,
        junction_id: &ItemId,
        pass: &mut Pass,
    ) -> Result<()> {
        self.cancel.check()?;
        let row = match self
            .gateway
            .fetch_junction_row(&keys.junction, junction_id)
            .await
        {
            Ok(row) => row,
            Err(source) => {
                pass.diagnostics.push(
                    field.path.clone(),
                    Error::JunctionResolution {
                        junction: keys.junction.clone(),
                        id: junction_id.clone(),
                        reason: source.to_string(),
                    },
                );
                return Ok(());
            }
        };

        let Some(related) = row
            .get(&keys.item)
            .and_then(|item| row_id(item, &self.config.id_field))
        else {
            pass.diagnostics.push(
                field.path.clone(),
                Error::JunctionResolution {
                    junction: keys.junction.clone(),
                    id: junction_id.clone(),
                    reason: format!("row has no {} reference", keys.item),
                },
            );
            return Ok(());
        };

        match rows
            .iter()
            .position(|row| self.envelope_item_id(row, keys).as_ref() == Some(&related))
        {
            Some(index) => {
                rows.remove(index);
            }
            None => pass.diagnostics.push(
                field.path.clone(),
                field.invalid(format!("no entry for item {}", related)),
            ),
        }
        Ok(())
    }

    /// The field's current rows, or `None` when the value is not a list.
    fn current_rows(&self, field: &FieldContext<'_>, pass: &mut Pass) -> Option<Vec<Value>> {
        match field.current {
            Value::Array(rows) => Some(rows.clone()),
            Value::Null => Some(Vec::new()),
            other => {
                pass.diagnostics.push(
                    field.path.clone(),
                    field.invalid(format!("expected a list of rows, found {}", other)),
                );
                None
            }
        }
    }

    /// Shallow merge `{sort: patch.sort ?? 0, ...existing, ...patch}`.
    fn patch_row(&self, existing: &Value, patch: &Item) -> Item {
        let sort_field = self.config.sort_field.as_str();
        let mut row = Map::new();
        row.insert(
            sort_field.to_string(),
            patch.get(sort_field).cloned().unwrap_or_else(|| Value::from(0)),
        );
        match existing {
            Value::Object(existing) => row.extend(existing.clone()),
            // An unexpanded row is just its id.
            id => {
                row.insert(self.config.id_field.clone(), id.clone());
            }
        }
        row.extend(patch.clone());
        row
    }

    fn envelope_item_id(&self, row: &Value, keys: &EnvelopeKeys) -> Option<ItemId> {
        row.get(&keys.item)
            .and_then(|item| row_id(item, &self.config.id_field))
    }

    fn inline_item(&self, submitted: Value) -> Item {
        match submitted {
            Value::Object(item) => item,
            id => {
                let mut item = Map::new();
                item.insert(self.config.id_field.clone(), id);
                item
            }
        }
    }

    /// Tag an item with its collection.
    fn tag(&self, collection: &str, item: Item) -> Item {
        let mut tagged = Map::new();
        tagged.insert(
            self.config.collection_tag.clone(),
            Value::String(collection.to_string()),
        );
        tagged.extend(item);
        tagged
    }
}

fn resolve_plain(field: &FieldContext<'_>) -> Value {
    field
        .submitted
        .cloned()
        .unwrap_or_else(|| field.current.clone())
}

fn envelope_keys(relation: &Relation) -> EnvelopeKeys {
    EnvelopeKeys {
        junction: relation.collection.clone(),
        item: relation.field.clone(),
        collection: relation
            .collection_field()
            .unwrap_or(DEFAULT_COLLECTION_KEY)
            .to_string(),
    }
}
