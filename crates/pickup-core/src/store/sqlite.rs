//! `SQLite`-backed document store.
//!
//! Documents live in one table as JSON text. Read-modify-write operations run
//! inside `BEGIN IMMEDIATE` on a single pooled connection, which takes the
//! database write lock up front, so a union or difference on one document is
//! atomic against other connections and other processes.

use std::{path::Path, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Connection, SqliteConnection, SqlitePool,
};

use super::{
    apply_difference, apply_union, field_matches, merge_fields, new_document_id, Document,
    DocumentStore,
};
use crate::{Error, Result};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Document store over a `SQLite` database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) a database file.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| {
                Error::store(format!("Failed to open database {}: {e}", path.display()))
            })?;
        Self::with_pool(pool).await
    }

    /// Private in-memory database on a single connection.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| Error::store(format!("Failed to create in-memory database: {e}")))?;
        Self::with_pool(pool).await
    }

    /// Wrap an existing pool, creating the documents table if it does not exist.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| Error::store(format!("Failed to create documents table: {e}")))?;

        Ok(Self { pool })
    }

    /// Run `f` over the current document inside an immediate transaction.
    ///
    /// `f` returns the document to write back (`None` leaves the row as is)
    /// and a value handed to the caller.
    async fn modify<F, T>(&self, collection: &str, id: &str, f: F) -> Result<T>
    where
        F: FnOnce(Option<Document>) -> Result<(Option<Document>, T)> + Send,
        T: Send,
    {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin_with("BEGIN IMMEDIATE").await?;
        let value = modify_in(&mut *tx, collection, id, f).await?;
        tx.commit().await?;
        Ok(value)
    }
}

async fn modify_in<F, T>(
    conn: &mut SqliteConnection,
    collection: &str,
    id: &str,
    f: F,
) -> Result<T>
where
    F: FnOnce(Option<Document>) -> Result<(Option<Document>, T)> + Send,
{
    let row: Option<(String,)> =
        sqlx::query_as("SELECT body FROM documents WHERE collection = ?1 AND id = ?2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    let current = row.map(|(body,)| parse_body(&body)).transpose()?;

    let (next, value) = f(current)?;
    if let Some(doc) = next {
        write_body(conn, collection, id, &doc).await?;
    }
    Ok(value)
}

async fn write_body(
    conn: &mut SqliteConnection,
    collection: &str,
    id: &str,
    doc: &Document,
) -> Result<()> {
    let body = serde_json::to_string(doc)?;
    sqlx::query(
        "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)
         ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body",
    )
    .bind(collection)
    .bind(id)
    .bind(body)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn parse_body(body: &str) -> Result<Document> {
    serde_json::from_str(body).map_err(|e| Error::ParseError(format!("corrupt document: {e}")))
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT body FROM documents WHERE collection = ?1 AND id = ?2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|(body,)| parse_body(&body)).transpose()
    }

    async fn create_document(&self, collection: &str, id: &str, doc: Document) -> Result<()> {
        let body = serde_json::to_string(&doc)?;
        let result = sqlx::query(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)
             ON CONFLICT(collection, id) DO NOTHING",
        )
        .bind(collection)
        .bind(id)
        .bind(body)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(format!("{collection}/{id} already exists")));
        }
        Ok(())
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
        merge: bool,
    ) -> Result<()> {
        self.modify(collection, id, move |current| {
            let next = match current {
                Some(mut existing) if merge => {
                    merge_fields(&mut existing, doc);
                    existing
                }
                _ => doc,
            };
            Ok((Some(next), ()))
        })
        .await
    }

    async fn add_document(&self, collection: &str, doc: Document) -> Result<String> {
        let id = new_document_id();
        self.create_document(collection, &id, doc).await?;
        Ok(id)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ?1 AND id = ?2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("document", format!("{collection}/{id}")));
        }
        Ok(())
    }

    async fn union_update(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<()> {
        let added = self
            .modify(collection, id, |current| match current {
                Some(mut doc) => {
                    let added = apply_union(&mut doc, field, values);
                    Ok((Some(doc), added))
                }
                None => Err(Error::not_found("document", format!("{collection}/{id}"))),
            })
            .await?;
        tracing::debug!(collection, id, field, added, "union update");
        Ok(())
    }

    async fn difference_update(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<()> {
        let removed = self
            .modify(collection, id, |current| match current {
                Some(mut doc) => {
                    let removed = apply_difference(&mut doc, field, &values);
                    Ok((Some(doc), removed))
                }
                None => Ok((None, 0)),
            })
            .await?;
        tracing::debug!(collection, id, field, removed, "difference update");
        Ok(())
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Document)>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, body FROM documents WHERE collection = ?1 ORDER BY id")
                .bind(collection)
                .fetch_all(&self.pool)
                .await?;

        let mut found = Vec::new();
        for (id, body) in rows {
            let doc = parse_body(&body)?;
            if field_matches(&doc, field, value) {
                found.push((id, doc));
            }
        }
        Ok(found)
    }
}
