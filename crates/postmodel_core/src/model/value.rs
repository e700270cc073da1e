//! In-memory attribute values.

use crate::model::instance::ModelInstance;
use crate::store::DocumentId;
use serde_json::Value;

/// Current value of one model attribute.
///
/// Scalars are plain JSON. Reference attributes may hold the referenced
/// instances themselves; those are owned by the parent, so an in-memory
/// reference graph is always a tree.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Value(Value),
    Model(Box<ModelInstance>),
    Models(Vec<ModelInstance>),
}

impl AttrValue {
    pub fn null() -> Self {
        Self::Value(Value::Null)
    }

    /// JSON `null` counts as unset.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Value(Value::Null))
    }

    /// Returns the scalar JSON value, if this is one.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(Value::as_str)
    }

    pub fn as_model(&self) -> Option<&ModelInstance> {
        match self {
            Self::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_models(&self) -> Option<&[ModelInstance]> {
        match self {
            Self::Models(models) => Some(models),
            _ => None,
        }
    }

    /// Document ids this value points at.
    ///
    /// Covers both held instances (bound ones only) and stored ids, whether a
    /// single integer, a numeric string or a list of either.
    pub fn referenced_ids(&self) -> Vec<DocumentId> {
        match self {
            Self::Model(model) => model.id().into_iter().collect(),
            Self::Models(models) => models.iter().filter_map(ModelInstance::id).collect(),
            Self::Value(Value::Array(items)) => items.iter().filter_map(json_to_id).collect(),
            Self::Value(value) => json_to_id(value).into_iter().collect(),
        }
    }

    /// JSON form used by the external representation.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Model(model) => Value::Object(model.to_map()),
            Self::Models(models) => {
                Value::Array(models.iter().map(|m| Value::Object(m.to_map())).collect())
            }
        }
    }
}

impl Default for AttrValue {
    fn default() -> Self {
        Self::null()
    }
}

impl From<Value> for AttrValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<ModelInstance> for AttrValue {
    fn from(value: ModelInstance) -> Self {
        Self::Model(Box::new(value))
    }
}

impl From<Vec<ModelInstance>> for AttrValue {
    fn from(value: Vec<ModelInstance>) -> Self {
        Self::Models(value)
    }
}

/// Whether a stored metadata value counts as empty for default fallback.
pub(crate) fn is_empty_meta(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty() || text == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn json_to_id(value: &Value) -> Option<DocumentId> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{is_empty_meta, AttrValue};
    use serde_json::json;

    #[test]
    fn null_is_unset() {
        assert!(AttrValue::null().is_null());
        assert!(AttrValue::default().is_null());
        assert!(!AttrValue::from("").is_null());
    }

    #[test]
    fn stored_ids_are_read_from_numbers_strings_and_lists() {
        assert_eq!(AttrValue::from(json!(7)).referenced_ids(), vec![7]);
        assert_eq!(AttrValue::from("12").referenced_ids(), vec![12]);
        assert_eq!(
            AttrValue::from(json!([3, "4", "x", null])).referenced_ids(),
            vec![3, 4]
        );
        assert!(AttrValue::from("").referenced_ids().is_empty());
    }

    #[test]
    fn empty_meta_follows_falsy_values() {
        assert!(is_empty_meta(&json!(null)));
        assert!(is_empty_meta(&json!("")));
        assert!(is_empty_meta(&json!(0)));
        assert!(is_empty_meta(&json!(false)));
        assert!(is_empty_meta(&json!([])));
        assert!(is_empty_meta(&json!("0")));
        assert!(!is_empty_meta(&json!("0.5")));
        assert!(!is_empty_meta(&json!("00")));
        assert!(!is_empty_meta(&json!([0])));
    }
}
