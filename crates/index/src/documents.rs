use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use ingest::{Document, DocumentStatus};

use crate::error::StoreError;

/// Document metadata store, backed by the relational database. This is the
/// source of truth for everything about a document except its full content.
#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a document row, or overwrite its mutable fields when the id
    /// already exists (re-ingestion). `created_at` survives re-ingestion.
    pub async fn register(&self, doc: &Document) -> Result<(), StoreError> {
        let metadata_json = serde_json::to_string(&doc.metadata)?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, title, content_preview, metadata_json, status, chunk_count, created_at, uploaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                content_preview = excluded.content_preview,
                metadata_json = excluded.metadata_json,
                status = excluded.status,
                chunk_count = excluded.chunk_count,
                uploaded_at = excluded.uploaded_at
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.title)
        .bind(&doc.content_preview)
        .bind(&metadata_json)
        .bind(doc.status.as_str())
        .bind(doc.chunk_count as i64)
        .bind(doc.created_at.to_rfc3339())
        .bind(doc.uploaded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_indexed(&self, id: &str, chunk_count: usize) -> Result<(), StoreError> {
        sqlx::query("UPDATE documents SET status = 'indexed', chunk_count = ? WHERE id = ?")
            .bind(chunk_count as i64)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Mark a document failed and attach the human-readable reason to its
    /// metadata for display.
    pub async fn mark_error(&self, id: &str, reason: &str) -> Result<(), StoreError> {
        let row = sqlx::query("SELECT metadata_json FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(());
        };

        let metadata_json: String = row.try_get("metadata_json")?;
        let mut metadata: Map<String, Value> = serde_json::from_str(&metadata_json)?;
        metadata.insert("error".to_string(), Value::String(reason.to_string()));

        sqlx::query("UPDATE documents SET status = 'error', metadata_json = ? WHERE id = ?")
            .bind(serde_json::to_string(&metadata)?)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_document).transpose()
    }

    /// Newest-first listing; previews make this cheap regardless of content
    /// size.
    pub async fn list(&self, limit: usize) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query("SELECT * FROM documents ORDER BY created_at DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(row_to_document).collect()
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn row_to_document(row: SqliteRow) -> Result<Document, StoreError> {
    let metadata_json: String = row.try_get("metadata_json")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;
    let uploaded_at: String = row.try_get("uploaded_at")?;
    let chunk_count: i64 = row.try_get("chunk_count")?;

    Ok(Document {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content_preview: row.try_get("content_preview")?,
        metadata: serde_json::from_str(&metadata_json)?,
        status: DocumentStatus::from_db(&status),
        chunk_count: chunk_count as usize,
        created_at: parse_timestamp(&created_at)?,
        uploaded_at: parse_timestamp(&uploaded_at)?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}
