//! Model definitions and in-memory model state.
//!
//! # Responsibility
//! - Declare model types: schema, defaults, virtual attributes, hooks and
//!   finders, all registered up front on a `ModelDefinition`.
//! - Hold per-object state in `ModelInstance`.
//!
//! # Invariants
//! - Definitions are immutable once built and shared through `Arc`.
//! - Nothing in this module touches storage; persistence lives in `repo`.

pub mod content;
pub mod definition;
pub mod finder;
pub mod hooks;
pub mod instance;
pub mod schema;
pub mod value;
