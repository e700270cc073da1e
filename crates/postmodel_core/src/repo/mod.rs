//! Persistence bridge between model instances and a [`DocumentStore`].
//!
//! # Responsibility
//! - Translate instance state to document body fields and metadata rows.
//! - Resolve references by cascading saves of held instances.
//!
//! # Invariants
//! - Only this layer writes to the store on behalf of models.
//!
//! [`DocumentStore`]: crate::store::DocumentStore

pub mod model_repo;
mod relation;

pub use model_repo::ModelRepository;
