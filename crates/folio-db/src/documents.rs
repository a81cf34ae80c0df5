//! SQLite-backed document metadata store.
//!
//! All records live in one table keyed by the document id. The table is
//! created lazily by the first `create`, so `update` and `delete` on a fresh
//! store fail until something has been created.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use folio_core::defaults::COLLECTION;
use folio_core::{
    matches_key_value, require_id, ConnectParams, Document, DocumentStore, Error, Metadata,
    Result,
};

use crate::pool::create_pool;

/// Document store over a SQLite file.
///
/// Starts disconnected; call [`DocumentStore::connect`] before use.
#[derive(Debug, Default)]
pub struct SqliteDocumentStore {
    pool: RwLock<Option<SqlitePool>>,
}

impl SqliteDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store and connect it in one step.
    pub async fn open(params: &ConnectParams) -> Result<Self> {
        let store = Self::new();
        store.connect(params).await?;
        Ok(store)
    }

    async fn pool(&self) -> Result<SqlitePool> {
        self.pool
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::Connection("store is not connected".to_string()))
    }

    async fn collection_exists<'e, E>(executor: E) -> Result<bool>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(COLLECTION)
        .fetch_one(executor)
        .await?;
        Ok(count > 0)
    }

    /// Mutating transaction that takes the write lock up front, so it waits
    /// on the busy timeout rather than failing on a read-to-write upgrade.
    async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
        Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    async fn upsert(tx: &mut Transaction<'_, Sqlite>, id: Uuid, data: &[u8]) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO {COLLECTION} (id, data) VALUES (?, ?) \
             ON CONFLICT(id) DO UPDATE SET data = excluded.data"
        ))
        .bind(id.to_string())
        .bind(data)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Mutation against a collection that was never created.
    fn missing_collection() -> Error {
        Error::Store(format!("{} collection does not exist", COLLECTION))
    }

    /// Read against a collection that was never created.
    fn no_collection() -> Error {
        Error::NotFound(format!("{} collection does not exist", COLLECTION))
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn connect(&self, params: &ConnectParams) -> Result<()> {
        let mut guard = self.pool.write().await;
        if guard.is_some() {
            return Err(Error::Connection("store is already connected".to_string()));
        }
        *guard = Some(create_pool(params).await?);
        info!(
            subsystem = "database",
            component = "documents",
            op = "connect",
            path = %params.path.display(),
            "Document store connected"
        );
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if let Some(pool) = self.pool.write().await.take() {
            pool.close().await;
            info!(
                subsystem = "database",
                component = "documents",
                op = "disconnect",
                "Document store disconnected"
            );
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.pool.read().await.is_some()
    }

    async fn create(&self, doc: &dyn Document) -> Result<()> {
        let start = Instant::now();
        let id = require_id(doc)?;
        let data = doc.metadata().to_bytes()?;
        let pool = self.pool().await?;

        let mut tx = Self::begin_write(&pool).await?;
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {COLLECTION} (id TEXT PRIMARY KEY, data BLOB NOT NULL)"
        ))
        .execute(&mut *tx)
        .await?;
        Self::upsert(&mut tx, id, &data).await?;
        tx.commit().await?;

        debug!(
            subsystem = "database",
            component = "documents",
            op = "create",
            doc_id = %id,
            doc_type = doc.doc_type(),
            size = data.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Document created"
        );
        Ok(())
    }

    async fn read_raw(&self, id: Uuid) -> Result<Vec<u8>> {
        let pool = self.pool().await?;

        // Deferred transaction: takes a read snapshot only, never the write lock.
        let mut tx = pool.begin().await?;
        if !Self::collection_exists(&mut *tx).await? {
            return Err(Self::no_collection());
        }
        let data: Option<Vec<u8>> =
            sqlx::query_scalar(&format!("SELECT data FROM {COLLECTION} WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&mut *tx)
                .await?;
        tx.commit().await?;

        data.ok_or_else(|| Error::NotFound(format!("document {}", id)))
    }

    async fn read(&self, doc: &mut dyn Document, id: Uuid) -> Result<()> {
        let metadata = self.read_metadata(id).await?;
        doc.set_title(metadata.title.clone())?;
        doc.set_metadata(metadata)?;
        Ok(())
    }

    async fn update(&self, doc: &dyn Document) -> Result<()> {
        let start = Instant::now();
        let id = require_id(doc)?;
        let data = doc.metadata().to_bytes()?;
        let pool = self.pool().await?;

        let mut tx = Self::begin_write(&pool).await?;
        if !Self::collection_exists(&mut *tx).await? {
            warn!(
                subsystem = "database",
                component = "documents",
                op = "update",
                doc_id = %id,
                "Update before any document was created"
            );
            return Err(Self::missing_collection());
        }
        Self::upsert(&mut tx, id, &data).await?;
        tx.commit().await?;

        debug!(
            subsystem = "database",
            component = "documents",
            op = "update",
            doc_id = %id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Document updated"
        );
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let pool = self.pool().await?;

        let mut tx = Self::begin_write(&pool).await?;
        if !Self::collection_exists(&mut *tx).await? {
            return Err(Self::missing_collection());
        }
        let result = sqlx::query(&format!("DELETE FROM {COLLECTION} WHERE id = ?"))
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!(
            subsystem = "database",
            component = "documents",
            op = "delete",
            doc_id = %id,
            rows_affected = result.rows_affected(),
            "Document deleted"
        );
        Ok(())
    }

    async fn search_by_key_value(&self, key: &str, value: &str) -> Result<Vec<Metadata>> {
        let start = Instant::now();
        let pool = self.pool().await?;

        let mut tx = pool.begin().await?;
        if !Self::collection_exists(&mut *tx).await? {
            return Err(Self::no_collection());
        }
        let rows: Vec<Vec<u8>> =
            sqlx::query_scalar(&format!("SELECT data FROM {COLLECTION} ORDER BY rowid"))
                .fetch_all(&mut *tx)
                .await?;
        tx.commit().await?;
        let scanned = rows.len();

        let mut matches = Vec::new();
        for data in rows {
            let metadata = Metadata::from_bytes(&data)?;
            if matches_key_value(&metadata, key, value) {
                matches.push(metadata);
            }
        }

        debug!(
            subsystem = "database",
            component = "documents",
            op = "search",
            key = key,
            scanned = scanned,
            result_count = matches.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Key/value search complete"
        );
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::Notes;

    fn note(title: &str) -> Notes {
        let mut metadata = Metadata::new(Notes::TYPE);
        metadata.title = title.to_string();
        Notes {
            title: title.to_string(),
            metadata,
            content: String::new(),
        }
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let store = SqliteDocumentStore::new();
        assert!(!store.is_connected().await);

        let err = store.create(&note("x")).await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
        let err = store.read_raw(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[tokio::test]
    async fn test_connect_twice_fails_and_disconnect_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let params = ConnectParams::new(dir.path().join("store.db"));
        let store = SqliteDocumentStore::open(&params).await.unwrap();
        assert!(store.is_connected().await);

        let err = store.connect(&params).await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));

        store.disconnect().await.unwrap();
        store.disconnect().await.unwrap();
        assert!(!store.is_connected().await);

        store.connect(&params).await.unwrap();
        assert!(store.is_connected().await);
    }

    #[tokio::test]
    async fn test_create_requires_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteDocumentStore::open(&ConnectParams::new(dir.path().join("s.db")))
            .await
            .unwrap();
        let err = store.create(&Notes::default()).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
