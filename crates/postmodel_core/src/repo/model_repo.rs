//! Model repository: the persistence bridge between model instances and the
//! document store.
//!
//! # Responsibility
//! - Load body fields and metadata into instances; save them back.
//! - Provide class-level operations (find, all, count, finders, restore).
//! - Dispatch lifecycle hooks around load, save and delete.
//!
//! # Invariants
//! - Body write always precedes metadata writes.
//! - Relation cascades complete before the referencing metadata write.
//! - Hard delete clears metadata and writes the tombstone before purging.
//! - Metadata writes are not transactional with the body write; a failure
//!   part-way leaves earlier writes in place.

use crate::error::{ModelError, ModelResult};
use crate::model::definition::ModelDefinition;
use crate::model::finder::{FinderArgs, FinderOutput, LATEST};
use crate::model::hooks::{trigger, LifecycleHook};
use crate::model::instance::ModelInstance;
use crate::model::schema::{CONTENT, META_HARD_DELETED, META_ID, TITLE};
use crate::model::value::{is_empty_meta, AttrValue};
use crate::repo::relation::storage_value;
use crate::store::{
    DocumentFields, DocumentId, DocumentStatus, DocumentStore, OrderBy, QueryParams, SortOrder,
};
use log::{debug, error, info};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Class-level entry point for one model type over one store.
pub struct ModelRepository<'s, S: DocumentStore + ?Sized> {
    store: &'s S,
    definition: Arc<ModelDefinition>,
}

impl<'s, S: DocumentStore + ?Sized> ModelRepository<'s, S> {
    pub fn new(store: &'s S, definition: Arc<ModelDefinition>) -> Self {
        Self { store, definition }
    }

    pub fn definition(&self) -> &Arc<ModelDefinition> {
        &self.definition
    }

    pub fn store(&self) -> &'s S {
        self.store
    }

    /// Creates an unbound instance from defaults plus `values`.
    ///
    /// Undeclared names in `values` are ignored.
    pub fn new_instance<I, K, V>(&self, values: I) -> ModelInstance
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<AttrValue>,
    {
        let mut instance = ModelInstance::new(Arc::clone(&self.definition));
        for (attribute, value) in values {
            instance.set(attribute.as_ref(), value);
        }
        trigger(LifecycleHook::Booting, &mut instance);
        trigger(LifecycleHook::Booted, &mut instance);
        instance
    }

    /// Creates and saves an instance.
    pub fn insert<I, K, V>(
        &self,
        values: I,
        overrides: &DocumentFields,
    ) -> ModelResult<ModelInstance>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<AttrValue>,
    {
        let mut instance = self.new_instance(values);
        self.save(&mut instance, overrides)?;
        Ok(instance)
    }

    /// Persists the instance; see [`save_instance`].
    pub fn save(
        &self,
        instance: &mut ModelInstance,
        overrides: &DocumentFields,
    ) -> ModelResult<DocumentId> {
        save_instance(self.store, instance, overrides)
    }

    /// Loads a visible document of this model type.
    ///
    /// Missing, foreign-kind and trashed documents yield `None`.
    pub fn find(&self, id: DocumentId) -> ModelResult<Option<ModelInstance>> {
        if !self.exists(id, true)? {
            return Ok(None);
        }

        let mut instance = ModelInstance::new(Arc::clone(&self.definition));
        if load_instance(self.store, &mut instance, id)? {
            Ok(Some(instance))
        } else {
            Ok(None)
        }
    }

    /// Re-reads a bound instance from the store, discarding local changes.
    pub fn reload(&self, instance: &mut ModelInstance) -> ModelResult<bool> {
        let id = require_id(instance, "reload")?;
        load_instance(self.store, instance, id)
    }

    /// Checks existence, optionally requiring this model's discriminator.
    pub fn exists(&self, id: DocumentId, type_safe: bool) -> ModelResult<bool> {
        let kind = type_safe.then(|| self.definition.discriminator());
        Ok(self.store.document_exists(id, kind)?)
    }

    /// Number of documents of this model type in `status`.
    pub fn count(&self, status: DocumentStatus) -> ModelResult<u64> {
        Ok(self
            .store
            .count_documents(self.definition.discriminator(), status)?)
    }

    /// Published instances, highest id first.
    pub fn all(&self, limit: Option<u32>) -> ModelResult<Vec<ModelInstance>> {
        let mut params = QueryParams::new()
            .kind(self.definition.discriminator())
            .status(DocumentStatus::Publish)
            .order(OrderBy::Id, SortOrder::Desc);
        params.limit = limit.or(self.definition.config().all_default_limit);

        let ids = self.store.query(&params)?;
        self.find_many(&ids)
    }

    /// Loads every id that resolves to a visible instance, keeping order.
    pub fn find_many(&self, ids: &[DocumentId]) -> ModelResult<Vec<ModelInstance>> {
        let mut models = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(model) = self.find(*id)? {
                models.push(model);
            }
        }
        Ok(models)
    }

    /// Instances keyed by id; defaults to `all()`.
    pub fn keyed(
        &self,
        models: Option<Vec<ModelInstance>>,
    ) -> ModelResult<BTreeMap<DocumentId, ModelInstance>> {
        let models = match models {
            Some(models) => models,
            None => self.all(None)?,
        };
        Ok(models
            .into_iter()
            .filter_map(|model| model.id().map(|id| (id, model)))
            .collect())
    }

    /// One attribute per instance keyed by id; defaults to `all()`.
    pub fn pluck(
        &self,
        attribute: &str,
        models: Option<Vec<ModelInstance>>,
    ) -> ModelResult<BTreeMap<DocumentId, AttrValue>> {
        Ok(self
            .keyed(models)?
            .into_iter()
            .map(|(id, model)| (id, model.get(attribute, Value::Null)))
            .collect())
    }

    /// Most recent instances; `limit == 1` yields `FinderOutput::One`.
    pub fn latest(&self, limit: u32) -> ModelResult<FinderOutput> {
        let mut args = FinderArgs::new();
        args.insert("limit".to_string(), json!(limit));
        self.finder(LATEST, args)
    }

    /// Runs a registered finder.
    ///
    /// The query is always scoped to this model's discriminator and every
    /// result goes through `find`.
    pub fn finder(&self, name: &str, args: FinderArgs) -> ModelResult<FinderOutput> {
        let started_at = Instant::now();
        let kind = self.definition.discriminator();
        let finder = self
            .definition
            .finders()
            .get(name)
            .ok_or_else(|| ModelError::FinderNotFound {
                kind: kind.to_string(),
                finder: name.to_string(),
            })
            .inspect_err(|err| {
                error!("event=finder module=repo status=error kind={kind} finder={name} error={err}");
            })?;

        let mut params = finder.build_query(name, &args).inspect_err(|err| {
            error!("event=finder module=repo status=error kind={kind} finder={name} error={err}");
        })?;
        params.kind = Some(kind.to_string());

        let ids = self.store.query(&params)?;
        let results = self.find_many(&ids)?;
        debug!(
            "event=finder module=repo status=ok kind={kind} finder={name} results={} duration_ms={}",
            results.len(),
            started_at.elapsed().as_millis()
        );
        Ok(finder.finish(results, &args))
    }

    /// Soft delete: moves the document to the trash, keeping metadata.
    pub fn delete(&self, instance: &mut ModelInstance) -> ModelResult<()> {
        let id = require_id(instance, "delete")?;
        trigger(LifecycleHook::Deleting, instance);
        self.store.trash_document(id)?;
        let document = self.store.get_document(id)?;
        instance.bind(id, document);
        trigger(LifecycleHook::Deleted, instance);
        info!(
            "event=model_delete module=repo status=ok kind={} id={id} mode=soft",
            instance.kind()
        );
        Ok(())
    }

    /// Hard delete: clears body and metadata, writes the tombstone, then
    /// purges the document. Not reversible.
    pub fn hard_delete(&self, instance: &mut ModelInstance) -> ModelResult<()> {
        let id = require_id(instance, "hard delete")?;
        trigger(LifecycleHook::HardDeleting, instance);

        self.store.update_document(
            id,
            &DocumentFields::new().with_title("").with_content(""),
        )?;
        instance.put_loaded(TITLE, AttrValue::from(""));
        instance.put_loaded(CONTENT, AttrValue::from(""));
        for spec in self.definition.schema().attributes() {
            self.store.delete_metadata(id, &spec.name)?;
            instance.put_loaded(&spec.name, AttrValue::null());
        }
        self.store.set_metadata(id, META_ID, &Value::from(id))?;
        self.store.set_metadata(id, META_HARD_DELETED, &Value::from("1"))?;
        self.store.purge_document(id, true)?;
        instance.bind(id, None);

        trigger(LifecycleHook::HardDeleted, instance);
        info!(
            "event=model_delete module=repo status=ok kind={} id={id} mode=hard",
            instance.kind()
        );
        Ok(())
    }

    /// Takes a document out of the trash and loads it.
    pub fn restore(&self, id: DocumentId) -> ModelResult<Option<ModelInstance>> {
        if !self.exists(id, true)? {
            return Ok(None);
        }
        self.store.untrash_document(id)?;
        self.find(id)
    }
}

/// Writes body fields, then metadata for every stored attribute and `_id`.
///
/// Bound instances update their document (overrides win, other fields are
/// kept). Unbound instances insert one with the configured insert status,
/// then bind the new id. Hooks: `saving`, [`inserting`, `inserted`], `saved`.
pub(crate) fn save_instance<S: DocumentStore + ?Sized>(
    store: &S,
    instance: &mut ModelInstance,
    overrides: &DocumentFields,
) -> ModelResult<DocumentId> {
    let started_at = Instant::now();
    let definition = Arc::clone(instance.definition());
    trigger(LifecycleHook::Saving, instance);

    let id = match instance.id() {
        Some(id) => {
            let fields = body_fields(instance)
                .merged_with(overrides)
                .with_kind(definition.discriminator());
            store.update_document(id, &fields)?;
            instance.bind(id, store.get_document(id)?);
            id
        }
        None => {
            trigger(LifecycleHook::Inserting, instance);
            let fields = body_fields(instance)
                .with_status(definition.config().default_insert_status)
                .merged_with(overrides)
                .with_kind(definition.discriminator());
            let id = store.insert_document(&fields)?;
            instance.bind(id, store.get_document(id)?);
            instance.mark_persisted();
            trigger(LifecycleHook::Inserted, instance);
            id
        }
    };

    for spec in definition.schema().attributes() {
        let value = storage_value(store, instance, spec)?;
        store.set_metadata(id, &spec.name, &value)?;
    }
    store.set_metadata(id, META_ID, &Value::from(id))?;

    instance.mark_clean();
    trigger(LifecycleHook::Saved, instance);
    debug!(
        "event=model_save module=repo status=ok kind={} id={id} duration_ms={}",
        definition.discriminator(),
        started_at.elapsed().as_millis()
    );
    Ok(id)
}

/// Loads document `id` into `instance`. Returns `false` when the document is
/// missing or trashed; no hooks fire in that case.
///
/// Empty metadata falls back to the attribute default; absent metadata
/// without a default becomes `""`.
fn load_instance<S: DocumentStore + ?Sized>(
    store: &S,
    instance: &mut ModelInstance,
    id: DocumentId,
) -> ModelResult<bool> {
    let document = match store.get_document(id)? {
        Some(document) if !document.is_trashed() => document,
        _ => return Ok(false),
    };

    trigger(LifecycleHook::Booting, instance);

    let definition = Arc::clone(instance.definition());
    instance.put_loaded(TITLE, AttrValue::from(document.title.as_str()));
    instance.put_loaded(CONTENT, AttrValue::from(document.content.as_str()));

    for spec in definition.schema().attributes() {
        let meta = store.get_metadata(id, &spec.name)?;
        let value = match (meta, spec.default.as_ref()) {
            (Some(meta), _) if !is_empty_meta(&meta) => meta,
            (_, Some(default)) => default.clone(),
            (meta, None) => meta.unwrap_or_else(|| Value::from("")),
        };
        instance.put_loaded(&spec.name, AttrValue::Value(value));
    }

    instance.bind(id, Some(document));
    instance.mark_clean();
    trigger(LifecycleHook::Booted, instance);
    debug!(
        "event=model_load module=repo status=ok kind={} id={id}",
        definition.discriminator()
    );
    Ok(true)
}

/// Title and content as written on save; unset content is stored as `" "`.
fn body_fields(instance: &ModelInstance) -> DocumentFields {
    let content = instance
        .value(CONTENT)
        .and_then(AttrValue::as_str)
        .unwrap_or(" ");
    DocumentFields::new()
        .with_title(instance.title())
        .with_content(content)
}

fn require_id(instance: &ModelInstance, operation: &'static str) -> ModelResult<DocumentId> {
    instance.id().ok_or_else(|| ModelError::Unbound {
        kind: instance.kind().to_string(),
        operation,
    })
}
