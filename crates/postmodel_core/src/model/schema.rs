//! Attribute schema declarations.
//!
//! # Responsibility
//! - Describe which attributes a model type stores, their kinds and defaults.
//! - Answer exposure questions for the external representation.
//!
//! # Invariants
//! - `title` and `content` are implicit body attributes and never stored as
//!   metadata; they cannot be redeclared.
//! - Names are unique across stored and virtual attributes.
//! - Reserved metadata keys (leading `_`) cannot be declared.

use crate::config::ConfigError;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Body attribute mapped to the document title.
pub const TITLE: &str = "title";
/// Body attribute mapped to the document content.
pub const CONTENT: &str = "content";
/// Read-only derived attribute: filtered `content`.
pub const THE_CONTENT: &str = "the_content";

/// Metadata key mirroring the document id after every save.
pub const META_ID: &str = "_id";
/// Metadata tombstone written before a hard delete purges the document.
pub const META_HARD_DELETED: &str = "_hardDeleted";

/// How a stored attribute is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Opaque JSON value.
    Scalar,
    /// One model instance, persisted as its document id.
    Reference,
    /// Homogeneous list of model instances, persisted as ordered ids.
    ReferenceList,
}

/// One stored attribute declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    pub name: String,
    pub kind: AttributeKind,
    pub default: Option<Value>,
}

/// Static attribute schema of one model type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSchema {
    attributes: Vec<AttributeSpec>,
    virtual_names: BTreeSet<String>,
    exposed: BTreeSet<String>,
    serialized: Vec<String>,
}

impl AttributeSchema {
    pub(crate) fn push_attribute(&mut self, spec: AttributeSpec) -> Result<(), SchemaError> {
        self.ensure_free_name(&spec.name)?;
        self.attributes.push(spec);
        Ok(())
    }

    pub(crate) fn push_virtual(&mut self, name: &str) -> Result<(), SchemaError> {
        self.ensure_free_name(name)?;
        self.virtual_names.insert(name.to_string());
        Ok(())
    }

    pub(crate) fn set_default(&mut self, name: &str, value: Value) -> Result<(), SchemaError> {
        let spec = self
            .attributes
            .iter_mut()
            .find(|spec| spec.name == name)
            .ok_or_else(|| SchemaError::UnknownAttribute(name.to_string()))?;
        spec.default = Some(value);
        Ok(())
    }

    pub(crate) fn expose(&mut self, name: &str) {
        self.exposed.insert(name.to_string());
    }

    pub(crate) fn serialize_virtual(&mut self, name: &str) {
        if !self.serialized.iter().any(|existing| existing == name) {
            self.serialized.push(name.to_string());
        }
    }

    /// Checks cross-references once all declarations are in.
    pub(crate) fn validate(&self) -> Result<(), SchemaError> {
        for name in &self.exposed {
            if !self.is_declared(name) && name != TITLE && name != CONTENT {
                return Err(SchemaError::UnknownAttribute(name.clone()));
            }
        }
        for name in &self.serialized {
            if !self.is_virtual(name) {
                return Err(SchemaError::NotVirtual(name.clone()));
            }
        }
        Ok(())
    }

    /// Stored attributes in declaration order.
    pub fn attributes(&self) -> &[AttributeSpec] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|spec| spec.name == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<AttributeKind> {
        self.attribute(name).map(|spec| spec.kind)
    }

    pub fn default_of(&self, name: &str) -> Option<&Value> {
        self.attribute(name).and_then(|spec| spec.default.as_ref())
    }

    pub fn is_stored(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn is_virtual(&self, name: &str) -> bool {
        self.virtual_names.contains(name)
    }

    /// Stored or virtual.
    pub fn is_declared(&self, name: &str) -> bool {
        self.is_stored(name) || self.is_virtual(name)
    }

    /// Whether `set` may write this name into instance data.
    pub fn is_settable(&self, name: &str) -> bool {
        name == TITLE || name == CONTENT || self.is_stored(name)
    }

    /// Whether the attribute appears in the external representation.
    ///
    /// An empty allow-list exposes everything.
    pub fn is_exposed(&self, name: &str) -> bool {
        self.exposed.is_empty() || self.exposed.contains(name)
    }

    /// Virtual attributes included in the external representation.
    pub fn serialized(&self) -> &[String] {
        &self.serialized
    }

    fn ensure_free_name(&self, name: &str) -> Result<(), SchemaError> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed != name {
            return Err(SchemaError::InvalidName(name.to_string()));
        }
        if matches!(name, TITLE | CONTENT | THE_CONTENT | "id") || name.starts_with('_') {
            return Err(SchemaError::ReservedAttribute(name.to_string()));
        }
        if self.is_declared(name) {
            return Err(SchemaError::DuplicateAttribute(name.to_string()));
        }
        Ok(())
    }
}

/// Configuration errors raised while building a model definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    Config(ConfigError),
    InvalidName(String),
    ReservedAttribute(String),
    DuplicateAttribute(String),
    UnknownAttribute(String),
    NotVirtual(String),
    DuplicateHook(&'static str),
    DuplicateFinder(String),
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::InvalidName(name) => write!(f, "invalid attribute or finder name `{name}`"),
            Self::ReservedAttribute(name) => write!(f, "attribute name `{name}` is reserved"),
            Self::DuplicateAttribute(name) => write!(f, "attribute `{name}` declared twice"),
            Self::UnknownAttribute(name) => write!(f, "attribute `{name}` is not declared"),
            Self::NotVirtual(name) => {
                write!(f, "attribute `{name}` is not a virtual attribute")
            }
            Self::DuplicateHook(hook) => write!(f, "hook `{hook}` registered twice"),
            Self::DuplicateFinder(name) => write!(f, "finder `{name}` registered twice"),
        }
    }
}

impl Error for SchemaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for SchemaError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Declared defaults keyed by attribute name.
pub(crate) fn defaults(schema: &AttributeSchema) -> BTreeMap<String, Value> {
    schema
        .attributes()
        .iter()
        .filter_map(|spec| spec.default.clone().map(|value| (spec.name.clone(), value)))
        .collect()
}
