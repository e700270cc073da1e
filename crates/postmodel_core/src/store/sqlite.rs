//! SQLite implementation of the document store.
//!
//! # Responsibility
//! - Map document/metadata primitives onto `documents` and `document_meta`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Metadata values are stored as JSON text and decoded on read.
//! - Trash remembers the previous status so untrash can restore it.
//! - Read paths reject invalid persisted state instead of masking it.

use super::{
    Document, DocumentFields, DocumentId, DocumentStatus, DocumentStore, OrderBy, QueryParams,
    SortOrder, StoreError, StoreResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const DOCUMENT_SELECT_SQL: &str = "SELECT
    id,
    kind,
    title,
    content,
    status,
    created_at,
    thumbnail
FROM documents";

/// SQLite-backed document store.
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentStore<'conn> {
    /// Wraps a migrated connection (see [`crate::db::open_db`]).
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn current_status(&self, id: DocumentId) -> StoreResult<DocumentStatus> {
        let status_text: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM documents WHERE id = ?1;",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        let status_text = status_text.ok_or(StoreError::NotFound(id))?;
        parse_status(&status_text)
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn get_document(&self, id: DocumentId) -> StoreResult<Option<Document>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DOCUMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_document_row(row)?));
        }

        Ok(None)
    }

    fn document_exists(&self, id: DocumentId, kind: Option<&str>) -> StoreResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM documents
                WHERE id = ?1
                  AND (?2 IS NULL OR kind = ?2)
            );",
            params![id, kind],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn insert_document(&self, fields: &DocumentFields) -> StoreResult<DocumentId> {
        let kind = fields
            .kind
            .as_deref()
            .filter(|kind| !kind.trim().is_empty())
            .ok_or_else(|| StoreError::InvalidData("document kind is required".to_string()))?;

        self.conn.execute(
            "INSERT INTO documents (
                kind,
                title,
                content,
                status,
                thumbnail
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                kind,
                fields.title.as_deref().unwrap_or_default(),
                fields.content.as_deref().unwrap_or_default(),
                fields.status.unwrap_or(DocumentStatus::Draft).as_str(),
                fields.thumbnail.as_deref(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_document(&self, id: DocumentId, fields: &DocumentFields) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE documents
             SET
                kind = COALESCE(?2, kind),
                title = COALESCE(?3, title),
                content = COALESCE(?4, content),
                status = COALESCE(?5, status),
                thumbnail = COALESCE(?6, thumbnail),
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id,
                fields.kind.as_deref(),
                fields.title.as_deref(),
                fields.content.as_deref(),
                fields.status.map(DocumentStatus::as_str),
                fields.thumbnail.as_deref(),
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }

    fn trash_document(&self, id: DocumentId) -> StoreResult<()> {
        if self.current_status(id)? == DocumentStatus::Trash {
            return Ok(());
        }

        self.conn.execute(
            "UPDATE documents
             SET
                pre_trash_status = status,
                status = 'trash',
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [id],
        )?;
        Ok(())
    }

    fn untrash_document(&self, id: DocumentId) -> StoreResult<()> {
        if self.current_status(id)? != DocumentStatus::Trash {
            return Ok(());
        }

        self.conn.execute(
            "UPDATE documents
             SET
                status = COALESCE(pre_trash_status, 'draft'),
                pre_trash_status = NULL,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [id],
        )?;
        Ok(())
    }

    fn purge_document(&self, id: DocumentId, force: bool) -> StoreResult<()> {
        if !force && self.current_status(id)? != DocumentStatus::Trash {
            return self.trash_document(id);
        }

        let changed = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }

    fn get_metadata(&self, id: DocumentId, key: &str) -> StoreResult<Option<serde_json::Value>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT meta_value
                 FROM document_meta
                 WHERE document_id = ?1 AND meta_key = ?2;",
                params![id, key],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|err| {
                StoreError::InvalidData(format!(
                    "invalid metadata value for `{key}` on document {id}: {err}"
                ))
            })
        })
        .transpose()
    }

    fn set_metadata(
        &self,
        id: DocumentId,
        key: &str,
        value: &serde_json::Value,
    ) -> StoreResult<()> {
        if !self.document_exists(id, None)? {
            return Err(StoreError::NotFound(id));
        }

        self.conn.execute(
            "INSERT INTO document_meta (document_id, meta_key, meta_value)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (document_id, meta_key)
             DO UPDATE SET meta_value = excluded.meta_value;",
            params![id, key, encode_meta_value(value)?],
        )?;
        Ok(())
    }

    fn delete_metadata(&self, id: DocumentId, key: &str) -> StoreResult<()> {
        self.conn.execute(
            "DELETE FROM document_meta WHERE document_id = ?1 AND meta_key = ?2;",
            params![id, key],
        )?;
        Ok(())
    }

    fn query(&self, params: &QueryParams) -> StoreResult<Vec<DocumentId>> {
        let mut sql = String::from("SELECT d.id FROM documents d WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(kind) = params.kind.as_deref() {
            sql.push_str(" AND d.kind = ?");
            bind_values.push(Value::Text(kind.to_string()));
        }

        let statuses = params.effective_statuses();
        sql.push_str(&format!(" AND d.status IN ({})", placeholders(statuses.len())));
        bind_values.extend(
            statuses
                .iter()
                .map(|status| Value::Text(status.as_str().to_string())),
        );

        if !params.ids.is_empty() {
            sql.push_str(&format!(" AND d.id IN ({})", placeholders(params.ids.len())));
            bind_values.extend(params.ids.iter().map(|id| Value::Integer(*id)));
        }

        for filter in &params.meta {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1 FROM document_meta m
                    WHERE m.document_id = d.id AND m.meta_key = ? AND m.meta_value = ?
                )",
            );
            bind_values.push(Value::Text(filter.key.clone()));
            bind_values.push(Value::Text(encode_meta_value(&filter.value)?));
        }

        if let Some(search) = params.search.as_deref().filter(|text| !text.is_empty()) {
            sql.push_str(" AND (d.title LIKE ? ESCAPE '\\' OR d.content LIKE ? ESCAPE '\\')");
            let pattern = format!("%{}%", escape_like(search));
            bind_values.push(Value::Text(pattern.clone()));
            bind_values.push(Value::Text(pattern));
        }

        let column = match params.order_by {
            OrderBy::Id => "d.id",
            OrderBy::CreatedAt => "d.created_at",
            OrderBy::Title => "d.title",
        };
        let direction = match params.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        sql.push_str(&format!(" ORDER BY {column} {direction}, d.id {direction}"));

        if let Some(limit) = params.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if params.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(params.offset)));
            }
        } else if params.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(params.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }

        Ok(ids)
    }

    fn count_documents(&self, kind: &str, status: DocumentStatus) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE kind = ?1 AND status = ?2;",
            params![kind, status.as_str()],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| StoreError::InvalidData(format!("negative document count `{count}`")))
    }
}

fn parse_document_row(row: &Row<'_>) -> StoreResult<Document> {
    let status_text: String = row.get("status")?;
    Ok(Document {
        id: row.get("id")?,
        kind: row.get("kind")?,
        title: row.get("title")?,
        content: row.get("content")?,
        status: parse_status(&status_text)?,
        created_at: row.get("created_at")?,
        thumbnail: row.get("thumbnail")?,
    })
}

fn parse_status(value: &str) -> StoreResult<DocumentStatus> {
    DocumentStatus::parse(value).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid status `{value}` in documents.status"))
    })
}

fn encode_meta_value(value: &serde_json::Value) -> StoreResult<String> {
    serde_json::to_string(value)
        .map_err(|err| StoreError::InvalidData(format!("unencodable metadata value: {err}")))
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
