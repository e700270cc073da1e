//! Object-mapping layer over a document store with a metadata side-table.
//! Model types declare attributes, hooks and finders once; instances load and
//! save through a repository bound to a store.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;

pub use config::{ConfigError, ModelConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use error::{ModelError, ModelResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::definition::{ModelDefinition, ModelDefinitionBuilder};
pub use model::finder::{FinderArgs, FinderDefinition, FinderOutput};
pub use model::hooks::LifecycleHook;
pub use model::instance::ModelInstance;
pub use model::schema::{AttributeKind, AttributeSpec, SchemaError};
pub use model::value::AttrValue;
pub use repo::ModelRepository;
pub use store::{
    Document, DocumentFields, DocumentId, DocumentStatus, DocumentStore, MetaFilter, OrderBy,
    QueryParams, SortOrder, SqliteDocumentStore, StoreError, StoreResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
