//! # folio-db
//!
//! Storage layer for folio.
//!
//! This crate provides:
//! - SQLite connection pool management
//! - [`SqliteDocumentStore`], the key/value metadata store
//! - [`FilesystemBackend`], the streaming content store for uploaded files
//!
//! ## Example
//!
//! ```rust,ignore
//! use folio_db::{ConnectParams, DocumentStore, SqliteDocumentStore};
//!
//! let store = SqliteDocumentStore::open(&ConnectParams::new("./folio.db")).await?;
//! let hits = store.search_by_key_value("Author", "Ada").await?;
//! ```

pub mod documents;
pub mod file_storage;
pub mod pool;

// Store fixtures for tests in dependent crates
#[cfg(feature = "test-fixtures")]
pub mod test_fixtures;

pub use documents::SqliteDocumentStore;
pub use file_storage::FilesystemBackend;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};

// Re-export core types
pub use folio_core::*;
