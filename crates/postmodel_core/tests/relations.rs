use postmodel_core::db::open_db_in_memory;
use postmodel_core::{
    AttrValue, DocumentFields, DocumentStore, ModelDefinition, ModelError, ModelRepository,
    SqliteDocumentStore, StoreError,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn author() -> Arc<ModelDefinition> {
    ModelDefinition::builder("author")
        .attribute("country")
        .build()
        .unwrap()
}

fn chapter() -> Arc<ModelDefinition> {
    ModelDefinition::builder("chapter").build().unwrap()
}

fn book() -> Arc<ModelDefinition> {
    ModelDefinition::builder("book")
        .reference("author")
        .reference_list("chapters")
        .build()
        .unwrap()
}

#[test]
fn saving_parent_saves_new_child_first() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let books = ModelRepository::new(&store, book());
    let authors = ModelRepository::new(&store, author());

    let herbert = authors.new_instance([("title", "Frank Herbert"), ("country", "US")]);
    let mut dune = books.new_instance([("title", "Dune")]);
    assert!(dune.set("author", herbert));

    let book_id = books.save(&mut dune, &DocumentFields::default()).unwrap();

    let child = dune.value("author").and_then(AttrValue::as_model).unwrap();
    let author_id = child.id().unwrap();
    assert!(!child.is_new());
    assert_eq!(store.get_metadata(book_id, "author").unwrap(), Some(json!(author_id)));

    let loaded = authors.find(author_id).unwrap().unwrap();
    assert_eq!(loaded.title(), "Frank Herbert");
    assert_eq!(loaded.get("country", Value::Null), AttrValue::from("US"));

    let reloaded = books.find(book_id).unwrap().unwrap();
    assert_eq!(reloaded.reference_ids("author"), vec![author_id]);
}

#[test]
fn reference_lists_are_written_as_ordered_ids() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let books = ModelRepository::new(&store, book());
    let chapters = ModelRepository::new(&store, chapter());

    let existing = chapters
        .insert([("title", "two")], &DocumentFields::default())
        .unwrap();
    let fresh = chapters.new_instance([("title", "one")]);

    let mut dune = books.new_instance([("title", "Dune")]);
    assert!(dune.set("chapters", vec![fresh, existing.clone()]));
    let book_id = books.save(&mut dune, &DocumentFields::default()).unwrap();

    let held = dune.value("chapters").and_then(AttrValue::as_models).unwrap();
    let fresh_id = held[0].id().unwrap();
    let existing_id = existing.id().unwrap();
    assert_eq!(
        store.get_metadata(book_id, "chapters").unwrap(),
        Some(json!([fresh_id, existing_id]))
    );

    let loaded = books.find(book_id).unwrap().unwrap();
    let ids = loaded.reference_ids("chapters");
    assert_eq!(ids, vec![fresh_id, existing_id]);
    let titles: Vec<_> = chapters
        .find_many(&ids)
        .unwrap()
        .iter()
        .map(|model| model.title().to_string())
        .collect();
    assert_eq!(titles, vec!["one", "two"]);
}

#[test]
fn clean_persisted_children_are_not_rewritten() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let books = ModelRepository::new(&store, book());
    let authors = ModelRepository::new(&store, author());

    let herbert = authors
        .insert([("title", "Frank Herbert")], &DocumentFields::default())
        .unwrap();
    let author_id = herbert.id().unwrap();
    store
        .update_document(author_id, &DocumentFields::new().with_title("changed elsewhere"))
        .unwrap();

    let mut dune = books.new_instance([("title", "Dune")]);
    dune.set("author", herbert);
    books.save(&mut dune, &DocumentFields::default()).unwrap();

    let stored = store.get_document(author_id).unwrap().unwrap();
    assert_eq!(stored.title, "changed elsewhere");
}

#[test]
fn editing_a_held_child_cascades_on_next_save() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let books = ModelRepository::new(&store, book());
    let authors = ModelRepository::new(&store, author());

    let mut dune = books.new_instance([("title", "Dune")]);
    dune.set("author", authors.new_instance([("title", "F. Herbert")]));
    books.save(&mut dune, &DocumentFields::default()).unwrap();

    dune.reference_mut("author").unwrap().set("title", "Frank Herbert");
    assert!(dune.is_dirty());
    books.save(&mut dune, &DocumentFields::default()).unwrap();

    let author_id = dune.reference_ids("author")[0];
    assert_eq!(
        store.get_document(author_id).unwrap().unwrap().title,
        "Frank Herbert"
    );
}

#[test]
fn raw_ids_are_stored_as_given() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let books = ModelRepository::new(&store, book());

    let mut dune = books.new_instance([("title", "Dune")]);
    dune.set("chapters", json!([3, 1]));
    let id = books.save(&mut dune, &DocumentFields::default()).unwrap();

    assert_eq!(store.get_metadata(id, "chapters").unwrap(), Some(json!([3, 1])));
    assert_eq!(store.get_metadata(id, "author").unwrap(), Some(json!("")));
}

#[test]
fn failed_child_save_aborts_parent_metadata_write() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let books = ModelRepository::new(&store, book());
    let authors = ModelRepository::new(&store, author());

    let mut herbert = authors
        .insert([("title", "Frank Herbert")], &DocumentFields::default())
        .unwrap();
    let author_id = herbert.id().unwrap();
    herbert.set("title", "gone");
    store.purge_document(author_id, true).unwrap();

    let mut dune = books.new_instance([("title", "Dune")]);
    dune.set("author", herbert);
    let err = books.save(&mut dune, &DocumentFields::default()).unwrap_err();

    match err {
        ModelError::Cascade { attribute, source } => {
            assert_eq!(attribute, "author");
            assert!(matches!(
                *source,
                ModelError::Store(StoreError::NotFound(id)) if id == author_id
            ));
        }
        other => panic!("unexpected error: {other}"),
    }

    let book_id = dune.id().unwrap();
    assert_eq!(store.get_metadata(book_id, "author").unwrap(), None);
    assert!(dune.is_dirty());
    assert!(!dune.is_new());
}

#[test]
fn parent_left_half_saved_is_updated_not_reinserted() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteDocumentStore::new(&conn);
    let books = ModelRepository::new(&store, book());
    let authors = ModelRepository::new(&store, author());

    let mut herbert = authors
        .insert([("title", "Frank Herbert")], &DocumentFields::default())
        .unwrap();
    herbert.set("title", "gone");
    store.purge_document(herbert.id().unwrap(), true).unwrap();

    let mut dune = books.new_instance([("title", "Dune")]);
    dune.set("author", herbert);
    books.save(&mut dune, &DocumentFields::default()).unwrap_err();
    let book_id = dune.id().unwrap();

    dune.set("author", json!(""));
    let saved_id = books.save(&mut dune, &DocumentFields::default()).unwrap();

    assert_eq!(saved_id, book_id);
    assert_eq!(books.count(postmodel_core::DocumentStatus::Publish).unwrap(), 1);
    assert!(!dune.is_dirty());
}
