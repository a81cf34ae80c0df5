//! Scratch stores for the storage integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use folio_db::{ConnectParams, FilesystemBackend, Metadata, Notes, SqliteDocumentStore};

/// Connected document store and file store sharing one temporary directory.
pub struct TestStore {
    pub documents: Arc<SqliteDocumentStore>,
    pub files: Arc<FilesystemBackend>,
    pub params: ConnectParams,
    dir: TempDir,
}

impl TestStore {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let params = ConnectParams::new(dir.path().join("folio.db"));
        let documents = SqliteDocumentStore::open(&params)
            .await
            .expect("Failed to open test store");

        Self {
            documents: Arc::new(documents),
            files: Arc::new(FilesystemBackend::new(dir.path().join("storage"))),
            params,
            dir,
        }
    }

    pub fn storage_root(&self) -> PathBuf {
        self.dir.path().join("storage")
    }
}

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
