//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `postmodel_core` linkage end to end against an in-memory store.
//! - Keep output deterministic for quick local sanity checks.

use postmodel_core::{
    open_db_in_memory, DocumentFields, ModelDefinition, ModelRepository, SqliteDocumentStore,
};
use serde_json::Value;
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("postmodel_core ping={}", postmodel_core::ping());
    println!("postmodel_core version={}", postmodel_core::core_version());

    match probe() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("postmodel_core probe=error error={err}");
            ExitCode::FAILURE
        }
    }
}

fn probe() -> Result<(), Box<dyn Error>> {
    let conn = open_db_in_memory()?;
    let store = SqliteDocumentStore::new(&conn);
    let definition = ModelDefinition::builder("probe")
        .attribute_with_default("color", "blue")
        .build()?;
    let repo = ModelRepository::new(&store, definition);

    let saved = repo.insert([("title", "smoke")], &DocumentFields::default())?;
    let id = saved.id().ok_or("probe was not assigned an id")?;
    let loaded = repo.find(id)?.ok_or("probe not found after save")?;

    println!("postmodel_core probe={}", Value::Object(loaded.to_map()));
    Ok(())
}
