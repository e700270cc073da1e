//! Document store contracts.
//!
//! # Responsibility
//! - Define the primitives the model layer persists through: documents with
//!   two body fields plus a per-document key/value metadata side-table.
//! - Keep storage details (SQL, indexing) behind one trait.
//!
//! # Invariants
//! - Document identity is assigned by the store on insert and never reused.
//! - Metadata values are opaque JSON; the store does not interpret them
//!   except for equality filters in `query`.
//! - Purging a document removes its metadata as well.

use crate::db::DbError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod query;
pub mod sqlite;

pub use query::{MetaFilter, OrderBy, QueryParams, SortOrder};
pub use sqlite::SqliteDocumentStore;

/// Store-assigned document identifier.
pub type DocumentId = i64;

pub type StoreResult<T> = Result<T, StoreError>;

/// Publication state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Publish,
    Draft,
    Pending,
    Private,
    Future,
    /// Soft-deleted; hidden from lookups until untrashed.
    Trash,
}

impl DocumentStatus {
    /// Stable string id used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Private => "private",
            Self::Future => "future",
            Self::Trash => "trash",
        }
    }

    /// Parses a stored status string.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "publish" => Some(Self::Publish),
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "private" => Some(Self::Private),
            "future" => Some(Self::Future),
            "trash" => Some(Self::Trash),
            _ => None,
        }
    }
}

impl Display for DocumentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary persisted record.
///
/// Everything except `title` and `content` is owned by the store and read-only
/// from the model layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// Discriminator of the model type owning this document.
    pub kind: String,
    pub title: String,
    pub content: String,
    pub status: DocumentStatus,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Associated media reference.
    pub thumbnail: Option<String>,
}

impl Document {
    /// Returns whether the document is in the trash.
    pub fn is_trashed(&self) -> bool {
        self.status == DocumentStatus::Trash
    }
}

/// Field set for document insert/update.
///
/// `None` fields are left untouched on update and take store defaults on
/// insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentFields {
    pub kind: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<DocumentStatus>,
    pub thumbnail: Option<String>,
}

impl DocumentFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_status(mut self, status: DocumentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    /// Returns `self` with every field set in `overrides` replaced.
    pub fn merged_with(self, overrides: &DocumentFields) -> Self {
        Self {
            kind: overrides.kind.clone().or(self.kind),
            title: overrides.title.clone().or(self.title),
            content: overrides.content.clone().or(self.content),
            status: overrides.status.or(self.status),
            thumbnail: overrides.thumbnail.clone().or(self.thumbnail),
        }
    }
}

/// Store error for document/metadata primitives.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    NotFound(DocumentId),
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "document not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid document data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence primitives consumed by the model layer.
pub trait DocumentStore {
    fn get_document(&self, id: DocumentId) -> StoreResult<Option<Document>>;

    /// Returns whether the document exists (in any status, trash included).
    ///
    /// With `kind = Some(..)` the document must also belong to that kind.
    fn document_exists(&self, id: DocumentId, kind: Option<&str>) -> StoreResult<bool>;

    /// Inserts a document; `fields.kind` is required.
    fn insert_document(&self, fields: &DocumentFields) -> StoreResult<DocumentId>;

    /// Updates the set fields, preserving all others.
    fn update_document(&self, id: DocumentId, fields: &DocumentFields) -> StoreResult<()>;

    fn trash_document(&self, id: DocumentId) -> StoreResult<()>;
    fn untrash_document(&self, id: DocumentId) -> StoreResult<()>;

    /// Removes the document and its metadata.
    ///
    /// Without `force`, a document that is not yet trashed is trashed instead.
    fn purge_document(&self, id: DocumentId, force: bool) -> StoreResult<()>;

    fn get_metadata(&self, id: DocumentId, key: &str) -> StoreResult<Option<serde_json::Value>>;
    fn set_metadata(&self, id: DocumentId, key: &str, value: &serde_json::Value)
        -> StoreResult<()>;
    fn delete_metadata(&self, id: DocumentId, key: &str) -> StoreResult<()>;

    /// Runs a declarative query and returns matching ids in result order.
    fn query(&self, params: &QueryParams) -> StoreResult<Vec<DocumentId>>;

    fn count_documents(&self, kind: &str, status: DocumentStatus) -> StoreResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::{DocumentFields, DocumentStatus};

    #[test]
    fn status_strings_roundtrip() {
        for status in [
            DocumentStatus::Publish,
            DocumentStatus::Draft,
            DocumentStatus::Pending,
            DocumentStatus::Private,
            DocumentStatus::Future,
            DocumentStatus::Trash,
        ] {
            assert_eq!(DocumentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DocumentStatus::parse("Publish"), None);
    }

    #[test]
    fn overrides_win_and_unset_fields_are_kept() {
        let base = DocumentFields::new()
            .with_title("base title")
            .with_content("body")
            .with_status(DocumentStatus::Publish);
        let overrides = DocumentFields::new()
            .with_status(DocumentStatus::Draft)
            .with_thumbnail("cover.png");

        let merged = base.merged_with(&overrides);
        assert_eq!(merged.title.as_deref(), Some("base title"));
        assert_eq!(merged.content.as_deref(), Some("body"));
        assert_eq!(merged.status, Some(DocumentStatus::Draft));
        assert_eq!(merged.thumbnail.as_deref(), Some("cover.png"));
        assert_eq!(merged.kind, None);
    }
}
