//! Centralized default constants for folio.
//!
//! Crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// STORE
// =============================================================================

/// Name of the single logical collection holding serialized metadata.
pub const COLLECTION: &str = "documents";

/// Default path of the store file.
pub const DB_PATH: &str = "./folio.db";

/// Default permission bits for a newly created store file.
pub const DB_MODE: u32 = 0o600;

/// How long a writer waits on SQLite's lock before giving up.
pub const DB_BUSY_TIMEOUT_SECS: u64 = 5;

/// Connections in the store pool (one writer at a time, the rest read).
pub const DB_MAX_CONNECTIONS: u32 = 4;

// =============================================================================
// FILE STORAGE
// =============================================================================

/// Default base directory of the content store.
pub const STORAGE_PATH: &str = "./storage";

// =============================================================================
// TRANSFER
// =============================================================================

/// Fixed chunk size for file transfer, in bytes. Not negotiated.
pub const TRANSFER_CHUNK_SIZE: usize = 4096;

/// Chunks buffered between the upload receive loop and the writer task.
pub const UPLOAD_CHANNEL_CAPACITY: usize = 8;

/// Largest frame accepted on the transfer connection.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default search page.
pub const PAGE: usize = 1;

/// Default search page size.
pub const PAGE_LIMIT: usize = 10;

/// Largest accepted search page size.
pub const PAGE_LIMIT_MAX: usize = 100;

// =============================================================================
// SERVER
// =============================================================================

/// Default bind host.
pub const HOST: &str = "0.0.0.0";

/// Default REST port.
pub const REST_PORT: u16 = 8080;

/// Default transfer (streaming RPC) port.
pub const TRANSFER_PORT: u16 = 5001;

/// Default request body cap for uploads (1 GiB).
pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

/// Default pandoc executable.
pub const PANDOC_PATH: &str = "pandoc";

/// Upper bound on a single pandoc invocation.
pub const PANDOC_TIMEOUT_SECS: u64 = 120;
