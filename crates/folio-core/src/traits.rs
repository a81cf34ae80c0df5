//! Core traits for folio storage abstractions.
//!
//! The REST and transfer layers depend only on these traits, so backends can
//! be swapped and tests can run against temporary directories.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use uuid::Uuid;

use crate::defaults;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::models::Metadata;

// =============================================================================
// DOCUMENT STORE
// =============================================================================

/// Parameters for opening the document store.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    /// Store file location; created if absent.
    pub path: PathBuf,
    /// Permission bits applied to a newly created store file.
    pub mode: u32,
    pub busy_timeout: Duration,
    pub max_connections: u32,
}

impl ConnectParams {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mode: defaults::DB_MODE,
            busy_timeout: Duration::from_secs(defaults::DB_BUSY_TIMEOUT_SECS),
            max_connections: defaults::DB_MAX_CONNECTIONS,
        }
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

/// Persistent key/value store of document metadata keyed by document id.
///
/// One logical collection holds every record. Creating a record creates the
/// collection if needed; updating or deleting requires that it already exists.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open the store. Fails if already connected.
    async fn connect(&self, params: &ConnectParams) -> Result<()>;

    /// Close the store. Calling it on a closed store is a no-op.
    async fn disconnect(&self) -> Result<()>;

    async fn is_connected(&self) -> bool;

    /// Persist the document's metadata under its id, overwriting any record
    /// already stored there.
    async fn create(&self, doc: &dyn Document) -> Result<()>;

    /// Raw stored bytes for an id.
    async fn read_raw(&self, id: Uuid) -> Result<Vec<u8>>;

    /// Load the stored metadata for `id` into `doc`.
    async fn read(&self, doc: &mut dyn Document, id: Uuid) -> Result<()>;

    /// Overwrite the record under the document's id.
    async fn update(&self, doc: &dyn Document) -> Result<()>;

    /// Remove a record. Deleting an absent id succeeds.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Every record whose `key` field equals `value` exactly.
    async fn search_by_key_value(&self, key: &str, value: &str) -> Result<Vec<Metadata>>;

    /// Decode the stored metadata for `id`.
    async fn read_metadata(&self, id: Uuid) -> Result<Metadata> {
        let bytes = self.read_raw(id).await?;
        Metadata::from_bytes(&bytes)
    }
}

/// Require an assigned id on a document about to be persisted.
pub fn require_id(doc: &dyn Document) -> Result<Uuid> {
    doc.id().ok_or_else(|| {
        Error::Validation(format!(
            "{} document has no Uuid assigned",
            doc.doc_type()
        ))
    })
}

// =============================================================================
// FILE STORE
// =============================================================================

/// Boxed byte source handed out by [`FileStore::get_file`].
pub type FileReader = Box<dyn AsyncRead + Send + Unpin>;

/// Content store for raw file bytes, addressed by relative path.
///
/// Paths must be non-empty, relative, and must not contain `..`.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stream `data` to `path`, returning the number of bytes written.
    ///
    /// The file becomes visible only once fully written.
    async fn save_file(&self, path: &str, data: &mut (dyn AsyncRead + Send + Unpin))
        -> Result<u64>;

    /// Open a stored file for reading.
    async fn get_file(&self, path: &str) -> Result<FileReader>;

    /// Remove a stored file. Fails if absent.
    async fn delete_file(&self, path: &str) -> Result<()>;

    /// Whether a file exists. Never fails; problems read as absent.
    async fn file_exists(&self, path: &str) -> bool;
}

/// Reject empty, absolute, and parent-escaping storage paths.
pub fn validate_storage_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::Validation("file path is empty".to_string()));
    }
    let p = std::path::Path::new(path);
    if p.is_absolute() || path.starts_with('/') || path.starts_with('\\') {
        return Err(Error::Validation(format!(
            "file path must be relative: {}",
            path
        )));
    }
    if p
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(Error::Validation(format!(
            "file path must not contain '..': {}",
            path
        )));
    }
    Ok(())
}
