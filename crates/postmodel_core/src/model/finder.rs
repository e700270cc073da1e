//! Named finder definitions.
//!
//! A finder pairs a query builder with an optional post-processor. The
//! builder returns JSON that must decode into [`QueryParams`]; anything else
//! is a malformed finder.

use crate::error::{ModelError, ModelResult};
use crate::model::instance::ModelInstance;
use crate::model::schema::SchemaError;
use crate::store::QueryParams;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Name of the built-in "most recent documents" finder.
pub const LATEST: &str = "latest";

/// Caller-supplied finder arguments.
pub type FinderArgs = Map<String, Value>;

pub type QueryBuilderFn = Arc<dyn Fn(&FinderArgs) -> Value + Send + Sync>;
pub type PostProcessorFn =
    Arc<dyn Fn(Vec<ModelInstance>, &FinderArgs) -> FinderOutput + Send + Sync>;

/// Result of a finder call.
#[derive(Debug, Clone, PartialEq)]
pub enum FinderOutput {
    One(Option<ModelInstance>),
    Many(Vec<ModelInstance>),
}

impl FinderOutput {
    pub fn into_vec(self) -> Vec<ModelInstance> {
        match self {
            Self::One(model) => model.into_iter().collect(),
            Self::Many(models) => models,
        }
    }

    /// Single result; for `Many`, the first element.
    pub fn into_one(self) -> Option<ModelInstance> {
        match self {
            Self::One(model) => model,
            Self::Many(models) => models.into_iter().next(),
        }
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Self::One(_))
    }
}

#[derive(Clone)]
pub struct FinderDefinition {
    builder: QueryBuilderFn,
    post_processor: Option<PostProcessorFn>,
}

impl FinderDefinition {
    pub fn new(builder: impl Fn(&FinderArgs) -> Value + Send + Sync + 'static) -> Self {
        Self {
            builder: Arc::new(builder),
            post_processor: None,
        }
    }

    pub fn with_post_processor(
        mut self,
        post_processor: impl Fn(Vec<ModelInstance>, &FinderArgs) -> FinderOutput
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.post_processor = Some(Arc::new(post_processor));
        self
    }

    pub fn has_post_processor(&self) -> bool {
        self.post_processor.is_some()
    }

    /// Runs the builder and decodes its output.
    pub(crate) fn build_query(&self, name: &str, args: &FinderArgs) -> ModelResult<QueryParams> {
        let raw = (self.builder)(args);
        if !raw.is_object() {
            return Err(ModelError::MalformedFinder {
                finder: name.to_string(),
                message: format!("expected an object, got {}", json_type_name(&raw)),
            });
        }
        serde_json::from_value(raw).map_err(|err| ModelError::MalformedFinder {
            finder: name.to_string(),
            message: err.to_string(),
        })
    }

    pub(crate) fn finish(&self, results: Vec<ModelInstance>, args: &FinderArgs) -> FinderOutput {
        match &self.post_processor {
            Some(post_processor) => post_processor(results, args),
            None => FinderOutput::Many(results),
        }
    }
}

impl Debug for FinderDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderDefinition")
            .field("post_processor", &self.post_processor.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FinderRegistry {
    finders: BTreeMap<String, FinderDefinition>,
}

impl FinderRegistry {
    pub(crate) fn register(
        &mut self,
        name: &str,
        definition: FinderDefinition,
    ) -> Result<(), SchemaError> {
        if name.trim().is_empty() {
            return Err(SchemaError::InvalidName(name.to_string()));
        }
        if self.finders.contains_key(name) {
            return Err(SchemaError::DuplicateFinder(name.to_string()));
        }
        self.finders.insert(name.to_string(), definition);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FinderDefinition> {
        self.finders.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.finders.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.finders.keys().map(String::as_str)
    }
}

/// Built-in `latest` finder.
///
/// Returns `One` when called with `limit == 1`, `Many` otherwise.
pub(crate) fn latest_finder(default_limit: u32) -> FinderDefinition {
    FinderDefinition::new(move |args| {
        json!({ "limit": limit_arg(args).unwrap_or(default_limit) })
    })
    .with_post_processor(|results, args| {
        if limit_arg(args) == Some(1) {
            FinderOutput::One(results.into_iter().next())
        } else {
            FinderOutput::Many(results)
        }
    })
}

/// Reads `limit` as a number or numeric string.
pub fn limit_arg(args: &FinderArgs) -> Option<u32> {
    match args.get("limit")? {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
