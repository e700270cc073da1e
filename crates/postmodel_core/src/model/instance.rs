//! Model instance state.
//!
//! # Responsibility
//! - Hold the authoritative in-memory attribute map of one model object.
//! - Track identity (`id`), the loaded document and `new`/`dirty` flags.
//! - Produce the external representation.
//!
//! # Invariants
//! - Every key in `data` is `title`, `content` or a stored attribute.
//! - `id == None` exactly when the instance has never been persisted.
//! - Reference lists only ever hold instances of one model kind.

use crate::model::definition::ModelDefinition;
use crate::model::schema;
use crate::model::schema::{AttributeKind, CONTENT, THE_CONTENT, TITLE};
use crate::model::value::AttrValue;
use crate::store::{Document, DocumentId};
use log::warn;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

#[derive(Clone)]
pub struct ModelInstance {
    definition: Arc<ModelDefinition>,
    id: Option<DocumentId>,
    data: BTreeMap<String, AttrValue>,
    document: Option<Document>,
    new: bool,
    dirty: bool,
}

impl ModelInstance {
    /// Creates an unbound instance holding the declared defaults.
    ///
    /// Hooks are not fired here; use `ModelRepository::new_instance` for the
    /// full boot cycle.
    pub fn new(definition: Arc<ModelDefinition>) -> Self {
        let mut data: BTreeMap<String, AttrValue> = schema::defaults(definition.schema())
            .into_iter()
            .map(|(name, value)| (name, AttrValue::Value(value)))
            .collect();
        data.insert(TITLE.to_string(), AttrValue::from(""));
        data.insert(CONTENT.to_string(), AttrValue::from(""));

        Self {
            definition,
            id: None,
            data,
            document: None,
            new: true,
            dirty: false,
        }
    }

    pub fn definition(&self) -> &Arc<ModelDefinition> {
        &self.definition
    }

    /// Discriminator of this instance's model type.
    pub fn kind(&self) -> &str {
        self.definition.discriminator()
    }

    pub fn id(&self) -> Option<DocumentId> {
        self.id
    }

    /// The underlying document as of the last load or save.
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Never persisted.
    pub fn is_new(&self) -> bool {
        self.new
    }

    /// Modified since the last load or save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Reads an attribute.
    ///
    /// Resolution order: `the_content`, stored value, virtual accessor,
    /// then `default`. A `null` stored value counts as absent.
    pub fn get(&self, attribute: &str, default: impl Into<AttrValue>) -> AttrValue {
        if attribute == THE_CONTENT {
            let content = self.content();
            return AttrValue::from(self.definition.render_content(content));
        }
        if let Some(value) = self.value(attribute) {
            return value.clone();
        }
        if let Some(value) = self.definition.virtual_value(attribute, self) {
            return AttrValue::Value(value);
        }
        default.into()
    }

    /// Borrowed stored value, if set and non-null.
    pub fn value(&self, attribute: &str) -> Option<&AttrValue> {
        self.data.get(attribute).filter(|value| !value.is_null())
    }

    pub fn title(&self) -> &str {
        self.body_field(TITLE)
    }

    pub fn content(&self) -> &str {
        self.body_field(CONTENT)
    }

    /// Writes an attribute, returning whether the write was applied.
    ///
    /// Undeclared names, virtual attributes and values that do not fit the
    /// attribute kind are ignored.
    pub fn set(&mut self, attribute: &str, value: impl Into<AttrValue>) -> bool {
        let value = value.into();
        if !self.accepts(attribute, &value) {
            warn!(
                "event=attr_set module=model status=ignored kind={} attribute={}",
                self.kind(),
                attribute
            );
            return false;
        }

        self.data.insert(attribute.to_string(), value);
        self.dirty = true;
        true
    }

    /// Mutable access to a held reference, marking this instance dirty.
    pub fn reference_mut(&mut self, attribute: &str) -> Option<&mut ModelInstance> {
        match self.data.get_mut(attribute) {
            Some(AttrValue::Model(model)) => {
                self.dirty = true;
                Some(model.as_mut())
            }
            _ => None,
        }
    }

    /// Mutable access to a held reference list, marking this instance dirty.
    pub fn references_mut(&mut self, attribute: &str) -> Option<&mut [ModelInstance]> {
        match self.data.get_mut(attribute) {
            Some(AttrValue::Models(models)) => {
                self.dirty = true;
                Some(models.as_mut_slice())
            }
            _ => None,
        }
    }

    /// Document ids a reference attribute points at, in order.
    pub fn reference_ids(&self, attribute: &str) -> Vec<DocumentId> {
        match self.definition.schema().kind_of(attribute) {
            Some(AttributeKind::Reference | AttributeKind::ReferenceList) => self
                .value(attribute)
                .map(AttrValue::referenced_ids)
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// External representation.
    ///
    /// Exposed stored attributes and serialized virtual attributes, plus
    /// `id`, `title` and `content`.
    pub fn to_map(&self) -> Map<String, Value> {
        let schema = self.definition.schema();
        let mut map = Map::new();

        let names = schema
            .attributes()
            .iter()
            .map(|spec| spec.name.as_str())
            .chain(schema.serialized().iter().map(String::as_str));
        for name in names.filter(|name| schema.is_exposed(name)) {
            map.insert(name.to_string(), self.get(name, Value::Null).to_json());
        }

        map.insert("id".to_string(), self.id.map_or(Value::Null, Value::from));
        map.insert(TITLE.to_string(), Value::from(self.title()));
        map.insert(CONTENT.to_string(), Value::from(self.content()));
        map
    }

    pub(crate) fn bind(&mut self, id: DocumentId, document: Option<Document>) {
        self.id = Some(id);
        self.document = document;
    }

    /// Writes a value read from storage without marking the instance dirty.
    pub(crate) fn put_loaded(&mut self, attribute: &str, value: AttrValue) {
        self.data.insert(attribute.to_string(), value);
    }

    /// Mutable stored value without touching the dirty flag.
    pub(crate) fn stored_mut(&mut self, attribute: &str) -> Option<&mut AttrValue> {
        self.data.get_mut(attribute)
    }

    /// The document exists but metadata may still be pending.
    pub(crate) fn mark_persisted(&mut self) {
        self.new = false;
        self.dirty = true;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.new = false;
        self.dirty = false;
    }

    fn body_field(&self, name: &str) -> &str {
        self.data
            .get(name)
            .and_then(AttrValue::as_str)
            .unwrap_or_default()
    }

    fn accepts(&self, attribute: &str, value: &AttrValue) -> bool {
        let schema = self.definition.schema();
        if !schema.is_settable(attribute) {
            return false;
        }

        match (schema.kind_of(attribute), value) {
            (_, AttrValue::Value(_)) => true,
            (Some(AttributeKind::Reference), AttrValue::Model(_)) => true,
            (Some(AttributeKind::ReferenceList), AttrValue::Models(models)) => {
                is_homogeneous(models)
            }
            _ => false,
        }
    }
}

fn is_homogeneous(models: &[ModelInstance]) -> bool {
    match models.first() {
        Some(first) => models.iter().all(|model| model.kind() == first.kind()),
        None => true,
    }
}

impl PartialEq for ModelInstance {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.id == other.id && self.data == other.data
    }
}

impl Debug for ModelInstance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelInstance")
            .field("kind", &self.kind())
            .field("id", &self.id)
            .field("data", &self.data)
            .field("new", &self.new)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl Serialize for ModelInstance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}
