//! Model-layer error taxonomy.
//!
//! - Configuration errors (`Config`, `FinderNotFound`, `MalformedFinder`) are
//!   programming errors in a model definition and are never retried.
//! - Not-found lookups are `Ok(None)`, not errors.
//! - `Store` carries persistence failures unchanged; partial metadata writes
//!   are not rolled back.
//! - `Cascade` wraps the failure of a nested relation save.

use crate::model::schema::SchemaError;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug)]
pub enum ModelError {
    Config(SchemaError),
    FinderNotFound {
        kind: String,
        finder: String,
    },
    MalformedFinder {
        finder: String,
        message: String,
    },
    Store(StoreError),
    Cascade {
        attribute: String,
        source: Box<ModelError>,
    },
    /// Operation needs a persisted instance.
    Unbound {
        kind: String,
        operation: &'static str,
    },
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid model definition: {err}"),
            Self::FinderNotFound { kind, finder } => {
                write!(f, "finder `{finder}` not found for model `{kind}`")
            }
            Self::MalformedFinder { finder, message } => write!(
                f,
                "finder `{finder}` must build a query parameter object: {message}"
            ),
            Self::Store(err) => write!(f, "{err}"),
            Self::Cascade { attribute, source } => {
                write!(f, "failed to save relation `{attribute}`: {source}")
            }
            Self::Unbound { kind, operation } => {
                write!(f, "cannot {operation} unsaved `{kind}` model")
            }
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Cascade { source, .. } => Some(source.as_ref()),
            Self::FinderNotFound { .. } | Self::MalformedFinder { .. } | Self::Unbound { .. } => {
                None
            }
        }
    }
}

impl From<SchemaError> for ModelError {
    fn from(value: SchemaError) -> Self {
        Self::Config(value)
    }
}

impl From<StoreError> for ModelError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl ModelError {
    /// Whether this is (or wraps) a store-level not-found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Store(StoreError::NotFound(_)) => true,
            Self::Cascade { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}
