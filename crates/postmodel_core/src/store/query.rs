//! Declarative query parameters passed through to the store.

use super::{DocumentId, DocumentStatus};
use serde::{Deserialize, Serialize};

/// Sort column for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    Id,
    #[default]
    CreatedAt,
    Title,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Exact-match filter on one metadata key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFilter {
    pub key: String,
    pub value: serde_json::Value,
}

/// Query parameters understood by [`super::DocumentStore::query`].
///
/// Unknown keys are rejected when decoding from JSON, so a finder builder
/// with a misspelled parameter fails instead of silently widening the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryParams {
    /// Model discriminator; forced by the finder dispatcher.
    pub kind: Option<String>,
    /// Allowed statuses. Empty means published only.
    pub statuses: Vec<DocumentStatus>,
    /// Restrict to these ids.
    pub ids: Vec<DocumentId>,
    pub meta: Vec<MetaFilter>,
    /// Substring match over title and content.
    pub search: Option<String>,
    pub order_by: OrderBy,
    pub order: SortOrder,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn status(mut self, status: DocumentStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn ids(mut self, ids: impl IntoIterator<Item = DocumentId>) -> Self {
        self.ids.extend(ids);
        self
    }

    pub fn meta_eq(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.meta.push(MetaFilter {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn order(mut self, order_by: OrderBy, order: SortOrder) -> Self {
        self.order_by = order_by;
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Statuses to match, applying the published-only default.
    pub fn effective_statuses(&self) -> Vec<DocumentStatus> {
        if self.statuses.is_empty() {
            vec![DocumentStatus::Publish]
        } else {
            self.statuses.clone()
        }
    }
}
