//! Model type definitions.
//!
//! # Responsibility
//! - Bundle config, schema, virtual accessors, hooks and finders of one model
//!   type into an immutable, shareable definition.
//! - Check every registration once, at `build`, instead of at call time.
//!
//! # Invariants
//! - Every virtual attribute has exactly one accessor.
//! - The built-in `latest` finder is always present unless overridden.

use crate::config::ModelConfig;
use crate::model::content::{render_paragraphs, ContentFilterFn};
use crate::model::finder::{latest_finder, FinderDefinition, FinderRegistry, LATEST};
use crate::model::hooks::{HookRegistry, LifecycleHook};
use crate::model::instance::ModelInstance;
use crate::model::schema::{AttributeKind, AttributeSchema, AttributeSpec, SchemaError};
use log::debug;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Computes a virtual attribute from the instance.
pub type VirtualAccessorFn = Arc<dyn Fn(&ModelInstance) -> Value + Send + Sync>;

/// Immutable description of one model type.
pub struct ModelDefinition {
    config: ModelConfig,
    schema: AttributeSchema,
    accessors: BTreeMap<String, VirtualAccessorFn>,
    hooks: HookRegistry,
    finders: FinderRegistry,
    content_filter: ContentFilterFn,
}

impl ModelDefinition {
    /// Starts a definition with default config for `discriminator`.
    pub fn builder(discriminator: impl Into<String>) -> ModelDefinitionBuilder {
        Self::with_config(ModelConfig::new(discriminator))
    }

    pub fn with_config(config: ModelConfig) -> ModelDefinitionBuilder {
        ModelDefinitionBuilder {
            config,
            schema: AttributeSchema::default(),
            accessors: BTreeMap::new(),
            hooks: HookRegistry::default(),
            finders: FinderRegistry::default(),
            content_filter: None,
            first_error: None,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn discriminator(&self) -> &str {
        &self.config.discriminator
    }

    pub fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn finders(&self) -> &FinderRegistry {
        &self.finders
    }

    pub(crate) fn virtual_value(&self, name: &str, instance: &ModelInstance) -> Option<Value> {
        self.accessors.get(name).map(|accessor| accessor(instance))
    }

    pub(crate) fn render_content(&self, content: &str) -> String {
        (self.content_filter)(content)
    }
}

impl Debug for ModelDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("config", &self.config)
            .field("schema", &self.schema)
            .field("virtual", &self.accessors.keys().collect::<Vec<_>>())
            .field("hooks", &self.hooks)
            .field("finders", &self.finders.names().collect::<Vec<_>>())
            .finish()
    }
}

/// Collects declarations; the first invalid one is reported by `build`.
pub struct ModelDefinitionBuilder {
    config: ModelConfig,
    schema: AttributeSchema,
    accessors: BTreeMap<String, VirtualAccessorFn>,
    hooks: HookRegistry,
    finders: FinderRegistry,
    content_filter: Option<ContentFilterFn>,
    first_error: Option<SchemaError>,
}

impl ModelDefinitionBuilder {
    /// Declares a scalar attribute.
    pub fn attribute(self, name: &str) -> Self {
        self.declare(name, AttributeKind::Scalar, None)
    }

    /// Declares a scalar attribute with a default value.
    pub fn attribute_with_default(self, name: &str, default: impl Into<Value>) -> Self {
        self.declare(name, AttributeKind::Scalar, Some(default.into()))
    }

    /// Declares an attribute holding one referenced model.
    pub fn reference(self, name: &str) -> Self {
        self.declare(name, AttributeKind::Reference, None)
    }

    /// Declares an attribute holding a homogeneous list of referenced models.
    pub fn reference_list(self, name: &str) -> Self {
        self.declare(name, AttributeKind::ReferenceList, None)
    }

    /// Sets the default of an already declared attribute.
    pub fn default(mut self, name: &str, value: impl Into<Value>) -> Self {
        let result = self.schema.set_default(name, value.into());
        self.record(result);
        self
    }

    /// Declares a computed attribute.
    pub fn virtual_attribute(
        mut self,
        name: &str,
        accessor: impl Fn(&ModelInstance) -> Value + Send + Sync + 'static,
    ) -> Self {
        let result = self.schema.push_virtual(name);
        if result.is_ok() {
            self.accessors.insert(name.to_string(), Arc::new(accessor));
        }
        self.record(result);
        self
    }

    /// Restricts the external representation to the listed attributes.
    pub fn expose<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        for name in names {
            self.schema.expose(name);
        }
        self
    }

    /// Includes a virtual attribute in the external representation.
    pub fn serialize(mut self, name: &str) -> Self {
        self.schema.serialize_virtual(name);
        self
    }

    /// Registers the handler for one lifecycle point.
    pub fn on(
        mut self,
        hook: LifecycleHook,
        handler: impl Fn(&mut ModelInstance) + Send + Sync + 'static,
    ) -> Self {
        let result = self.hooks.register(hook, Arc::new(handler));
        self.record(result);
        self
    }

    pub fn finder(mut self, name: &str, definition: FinderDefinition) -> Self {
        let result = self.finders.register(name, definition);
        self.record(result);
        self
    }

    /// Replaces the filter used for `the_content`.
    pub fn content_filter(
        mut self,
        filter: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.content_filter = Some(Arc::new(filter));
        self
    }

    pub fn build(mut self) -> Result<Arc<ModelDefinition>, SchemaError> {
        if let Some(err) = self.first_error.take() {
            return Err(err);
        }
        self.config.validate()?;
        self.schema.validate()?;

        if !self.finders.contains(LATEST) {
            self.finders
                .register(LATEST, latest_finder(self.config.latest_default_limit))?;
        }

        debug!(
            "event=model_define module=model status=ok kind={} attributes={} virtual={}",
            self.config.discriminator,
            self.schema.attributes().len(),
            self.accessors.len()
        );

        Ok(Arc::new(ModelDefinition {
            config: self.config,
            schema: self.schema,
            accessors: self.accessors,
            hooks: self.hooks,
            finders: self.finders,
            content_filter: self.content_filter.unwrap_or_else(default_content_filter),
        }))
    }

    fn declare(mut self, name: &str, kind: AttributeKind, default: Option<Value>) -> Self {
        let result = self.schema.push_attribute(AttributeSpec {
            name: name.to_string(),
            kind,
            default,
        });
        self.record(result);
        self
    }

    fn record(&mut self, result: Result<(), SchemaError>) {
        if let Err(err) = result {
            self.first_error.get_or_insert(err);
        }
    }
}

fn default_content_filter() -> ContentFilterFn {
    Arc::new(render_paragraphs)
}
