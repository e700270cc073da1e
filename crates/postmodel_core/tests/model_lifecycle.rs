use postmodel_core::db::open_db_in_memory;
use postmodel_core::{
    AttrValue, DocumentFields, LifecycleHook, ModelDefinition, ModelDefinitionBuilder,
    ModelRepository, SqliteDocumentStore,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};

const ALL_HOOKS: [LifecycleHook; 10] = [
    LifecycleHook::Booting,
    LifecycleHook::Booted,
    LifecycleHook::Saving,
    LifecycleHook::Inserting,
    LifecycleHook::Inserted,
    LifecycleHook::Saved,
    LifecycleHook::Deleting,
    LifecycleHook::Deleted,
    LifecycleHook::HardDeleting,
    LifecycleHook::HardDeleted,
];

type Journal = Arc<Mutex<Vec<&'static str>>>;

fn recording(builder: ModelDefinitionBuilder, journal: &Journal) -> Arc<ModelDefinition> {
    ALL_HOOKS
        .into_iter()
        .fold(builder, |builder, hook| {
            let journal = Arc::clone(journal);
            builder.on(hook, move |_| journal.lock().unwrap().push(hook.as_str()))
        })
        .build()
        .unwrap()
}

fn take(journal: &Journal) -> Vec<&'static str> {
    std::mem::take(&mut *journal.lock().unwrap())
}

#[test]
fn new_instance_boots() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let journal = Journal::default();
    let repo = ModelRepository::new(&store, recording(ModelDefinition::builder("book"), &journal));

    repo.new_instance([("title", "Dune")]);
    assert_eq!(take(&journal), vec!["booting", "booted"]);
}

#[test]
fn first_save_fires_insert_hooks_and_later_saves_do_not() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let journal = Journal::default();
    let repo = ModelRepository::new(&store, recording(ModelDefinition::builder("book"), &journal));

    let mut model = repo.new_instance([("title", "Dune")]);
    take(&journal);

    repo.save(&mut model, &DocumentFields::default()).unwrap();
    assert_eq!(take(&journal), vec!["saving", "inserting", "inserted", "saved"]);

    repo.save(&mut model, &DocumentFields::default()).unwrap();
    assert_eq!(take(&journal), vec!["saving", "saved"]);
}

#[test]
fn find_boots_once_and_delete_hooks_bracket_the_operation() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let journal = Journal::default();
    let repo = ModelRepository::new(&store, recording(ModelDefinition::builder("book"), &journal));

    let id = repo
        .insert([("title", "Dune")], &DocumentFields::default())
        .unwrap()
        .id()
        .unwrap();
    take(&journal);

    let mut model = repo.find(id).unwrap().unwrap();
    assert_eq!(take(&journal), vec!["booting", "booted"]);

    repo.delete(&mut model).unwrap();
    assert_eq!(take(&journal), vec!["deleting", "deleted"]);

    let mut restored = repo.restore(id).unwrap().unwrap();
    take(&journal);
    repo.hard_delete(&mut restored).unwrap();
    assert_eq!(take(&journal), vec!["hardDeleting", "hardDeleted"]);
}

#[test]
fn saving_hook_can_mutate_before_write() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let definition = ModelDefinition::builder("book")
        .attribute("slug")
        .on(LifecycleHook::Saving, |model| {
            let slug = model.title().to_lowercase().replace(' ', "-");
            model.set("slug", slug);
        })
        .build()
        .unwrap();
    let repo = ModelRepository::new(&store, definition);

    let model = repo
        .insert([("title", "Dune Messiah")], &DocumentFields::default())
        .unwrap();
    let loaded = repo.find(model.id().unwrap()).unwrap().unwrap();
    assert_eq!(loaded.get("slug", Value::Null), AttrValue::from("dune-messiah"));
}

#[test]
fn booted_hook_sees_loaded_values() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_hook = Arc::clone(&seen);
    let definition = ModelDefinition::builder("book")
        .on(LifecycleHook::Booted, move |model| {
            seen_by_hook
                .lock()
                .unwrap()
                .push((model.id(), model.title().to_string()));
        })
        .build()
        .unwrap();
    let repo = ModelRepository::new(&store, definition);

    let id = repo
        .insert([("title", "Dune")], &DocumentFields::default())
        .unwrap()
        .id()
        .unwrap();
    repo.find(id).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.as_slice(), &[(None, "Dune".to_string()), (Some(id), "Dune".to_string())]);
}

#[test]
fn models_without_hooks_still_persist() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let repo = ModelRepository::new(&store, ModelDefinition::builder("plain").build().unwrap());

    let mut model = repo
        .insert([("title", "quiet")], &DocumentFields::default())
        .unwrap();
    repo.delete(&mut model).unwrap();
    assert!(repo.find(model.id().unwrap()).unwrap().is_none());
}

#[test]
fn finding_trashed_or_missing_documents_fires_no_hooks() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let journal = Journal::default();
    let repo = ModelRepository::new(&store, recording(ModelDefinition::builder("book"), &journal));

    let mut model = repo
        .insert([("title", "Dune")], &DocumentFields::default())
        .unwrap();
    let id = model.id().unwrap();
    repo.delete(&mut model).unwrap();
    take(&journal);

    assert!(repo.find(id).unwrap().is_none());
    assert!(repo.find(id + 100).unwrap().is_none());
    assert!(!repo.reload(&mut model).unwrap());
    assert!(take(&journal).is_empty());
}
