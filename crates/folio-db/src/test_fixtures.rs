//! Test fixtures for store integration tests.
//!
//! Every fixture lives under its own temporary directory, which is removed
//! when the fixture is dropped.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_db::test_fixtures::{sample_note, TestStore};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let fixture = TestStore::new().await;
//!     fixture.documents.create(&sample_note("title", "author")).await.unwrap();
//! }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use folio_core::{ConnectParams, Metadata, Notes};

use crate::{FilesystemBackend, SqliteDocumentStore};

/// Connected document store plus file store rooted in a temporary directory.
pub struct TestStore {
    pub documents: Arc<SqliteDocumentStore>,
    pub files: Arc<FilesystemBackend>,
    pub params: ConnectParams,
    dir: TempDir,
}

impl TestStore {
    /// Create and connect a fresh store.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let params = ConnectParams::new(dir.path().join("folio.db"));
        let documents = SqliteDocumentStore::open(&params)
            .await
            .expect("Failed to open test store");
        let files = FilesystemBackend::new(dir.path().join("storage"));

        Self {
            documents: Arc::new(documents),
            files: Arc::new(files),
            params,
            dir,
        }
    }

    /// Root of the fixture's temporary directory.
    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Directory backing the file store.
    pub fn storage_root(&self) -> PathBuf {
        self.dir.path().join("storage")
    }
}

/// A `Notes` document with a fresh id.
pub fn sample_note(title: &str, author: &str) -> Notes {
    let mut metadata = Metadata::new(Notes::TYPE);
    metadata.title = title.to_string();
    metadata.author = author.to_string();
    Notes {
        title: title.to_string(),
        metadata,
        content: format!("{} body", title),
    }
}
