//! Lifecycle hook registry and dispatch.
//!
//! # Invariants
//! - At most one handler per hook point.
//! - Hooks run synchronously; the surrounding operation continues only after
//!   the handler returns.
//! - A point without a handler is skipped silently.

use crate::model::instance::ModelInstance;
use crate::model::schema::SchemaError;
use log::trace;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Handler invoked with the instance at a lifecycle point.
pub type HookFn = Arc<dyn Fn(&mut ModelInstance) + Send + Sync>;

/// Named points around load, save and delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleHook {
    Booting,
    Booted,
    Saving,
    Inserting,
    Inserted,
    Saved,
    Deleting,
    Deleted,
    HardDeleting,
    HardDeleted,
}

impl LifecycleHook {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Booting => "booting",
            Self::Booted => "booted",
            Self::Saving => "saving",
            Self::Inserting => "inserting",
            Self::Inserted => "inserted",
            Self::Saved => "saved",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
            Self::HardDeleting => "hardDeleting",
            Self::HardDeleted => "hardDeleted",
        }
    }
}

#[derive(Clone, Default)]
pub struct HookRegistry {
    handlers: BTreeMap<LifecycleHook, HookFn>,
}

impl HookRegistry {
    pub(crate) fn register(
        &mut self,
        hook: LifecycleHook,
        handler: HookFn,
    ) -> Result<(), SchemaError> {
        if self.handlers.contains_key(&hook) {
            return Err(SchemaError::DuplicateHook(hook.as_str()));
        }
        self.handlers.insert(hook, handler);
        Ok(())
    }

    pub fn has(&self, hook: LifecycleHook) -> bool {
        self.handlers.contains_key(&hook)
    }

    /// Runs the handler for `hook`, returning whether one was registered.
    pub fn fire(&self, hook: LifecycleHook, instance: &mut ModelInstance) -> bool {
        match self.handlers.get(&hook) {
            Some(handler) => {
                trace!(
                    "event=hook_fire module=model kind={} hook={}",
                    instance.kind(),
                    hook.as_str()
                );
                handler(instance);
                true
            }
            None => false,
        }
    }
}

impl Debug for HookRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(self.handlers.keys().map(|hook| hook.as_str()))
            .finish()
    }
}

/// Fires `hook` on the instance's own definition.
pub(crate) fn trigger(hook: LifecycleHook, instance: &mut ModelInstance) -> bool {
    let definition = Arc::clone(instance.definition());
    definition.hooks().fire(hook, instance)
}
