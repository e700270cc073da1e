//! Relation resolution for the metadata write step.
//!
//! # Invariants
//! - A referenced instance that is new or dirty is saved before its id is
//!   written into the parent's metadata.
//! - List references keep element order.
//! - A failed nested save aborts the parent's write of that attribute.

use crate::error::{ModelError, ModelResult};
use crate::model::instance::ModelInstance;
use crate::model::schema::{AttributeKind, AttributeSpec};
use crate::model::value::AttrValue;
use crate::repo::model_repo::save_instance;
use crate::store::{DocumentFields, DocumentStore};
use log::debug;
use serde_json::Value;

/// Produces the metadata value for one stored attribute, cascading saves of
/// referenced instances first.
///
/// Unset attributes are written as an empty string.
pub(crate) fn storage_value<S: DocumentStore + ?Sized>(
    store: &S,
    instance: &mut ModelInstance,
    spec: &AttributeSpec,
) -> ModelResult<Value> {
    match (spec.kind, instance.stored_mut(&spec.name)) {
        (AttributeKind::Reference, Some(AttrValue::Model(child))) => {
            cascade(store, child, &spec.name)
        }
        (AttributeKind::ReferenceList, Some(AttrValue::Models(children))) => children
            .iter_mut()
            .map(|child| cascade(store, child, &spec.name))
            .collect::<ModelResult<Vec<_>>>()
            .map(Value::Array),
        (_, Some(AttrValue::Value(value))) if !value.is_null() => Ok(value.clone()),
        _ => Ok(Value::from("")),
    }
}

fn cascade<S: DocumentStore + ?Sized>(
    store: &S,
    child: &mut ModelInstance,
    attribute: &str,
) -> ModelResult<Value> {
    if child.is_new() || child.is_dirty() {
        debug!(
            "event=relation_cascade module=repo attribute={} child_kind={} child_new={}",
            attribute,
            child.kind(),
            child.is_new()
        );
        save_instance(store, child, &DocumentFields::default()).map_err(|err| {
            ModelError::Cascade {
                attribute: attribute.to_string(),
                source: Box::new(err),
            }
        })?;
    }

    Ok(child.id().map_or(Value::Null, Value::from))
}
