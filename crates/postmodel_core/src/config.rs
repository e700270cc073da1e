//! Per-model-type configuration.
//!
//! # Invariants
//! - `discriminator` is non-empty, at most 20 chars, `[a-z0-9_-]` only.
//! - New documents are inserted with `default_insert_status` unless the
//!   caller overrides the status on save.

use crate::store::DocumentStatus;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const DISCRIMINATOR_MAX_CHARS: usize = 20;
const DEFAULT_LATEST_LIMIT: u32 = 3;

/// Storage-facing settings for one model type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Document `kind` owned by this model type.
    pub discriminator: String,
    /// Status used when inserting a document without an explicit override.
    pub default_insert_status: DocumentStatus,
    /// Page size for `latest` when called without a limit.
    pub latest_default_limit: u32,
    /// Page size for `all` when called without a limit. `None` is unbounded.
    pub all_default_limit: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            discriminator: String::new(),
            default_insert_status: DocumentStatus::Publish,
            latest_default_limit: DEFAULT_LATEST_LIMIT,
            all_default_limit: None,
        }
    }
}

impl ModelConfig {
    /// Creates a config with defaults for the given discriminator.
    pub fn new(discriminator: impl Into<String>) -> Self {
        Self {
            discriminator: discriminator.into(),
            ..Self::default()
        }
    }

    /// Validates declaration-level invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let discriminator = self.discriminator.as_str();
        if discriminator.trim().is_empty() {
            return Err(ConfigError::MissingDiscriminator);
        }
        if discriminator.chars().count() > DISCRIMINATOR_MAX_CHARS
            || !discriminator
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(ConfigError::InvalidDiscriminator(discriminator.to_string()));
        }
        if self.default_insert_status == DocumentStatus::Trash {
            return Err(ConfigError::InvalidInsertStatus(self.default_insert_status));
        }
        Ok(())
    }
}

/// Model configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingDiscriminator,
    InvalidDiscriminator(String),
    InvalidInsertStatus(DocumentStatus),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDiscriminator => write!(f, "model discriminator is not defined"),
            Self::InvalidDiscriminator(value) => write!(
                f,
                "model discriminator `{value}` must be 1-{DISCRIMINATOR_MAX_CHARS} chars of [a-z0-9_-]"
            ),
            Self::InvalidInsertStatus(status) => {
                write!(f, "`{status}` cannot be used as the insert status")
            }
        }
    }
}

impl Error for ConfigError {}
