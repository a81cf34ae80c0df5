//! Filesystem content store for uploaded files.
//!
//! Files are addressed by a relative path under a base directory. Writes are
//! streamed into a temporary sibling and renamed into place, so a partially
//! written upload never becomes visible under its final name.
//!
//! ## Example
//!
//! ```rust,ignore
//! use folio_db::FilesystemBackend;
//! use folio_core::FileStore;
//!
//! let backend = FilesystemBackend::new("./storage");
//! backend.validate().await?;
//!
//! let mut reader: &[u8] = b"hello";
//! let written = backend.save_file("3f1c.txt", &mut reader).await?;
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use folio_core::{validate_storage_path, Error, FileReader, FileStore, Result};

/// Filesystem storage backend.
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn full_path(&self, path: &str) -> Result<PathBuf> {
        validate_storage_path(path)?;
        Ok(self.base_path.join(path))
    }

    /// Validate that the storage backend can write, read, and delete files.
    ///
    /// Performs a full round-trip at startup to catch permission errors and
    /// missing directories early.
    pub async fn validate(&self) -> Result<()> {
        let test_dir = self.base_path.join(".health-check");
        let test_file = test_dir.join("probe.bin");

        fs::create_dir_all(&test_dir).await.map_err(|e| {
            Error::Config(format!("create_dir_all({}): {}", test_dir.display(), e))
        })?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| Error::Config(format!("write({}): {}", test_file.display(), e)))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| Error::Config(format!("read({}): {}", test_file.display(), e)))?;
        if read_data != data {
            return Err(Error::Config("storage read-back mismatch".to_string()));
        }

        fs::remove_file(&test_file).await.map_err(|e| {
            Error::Config(format!("remove_file({}): {}", test_file.display(), e))
        })?;
        let _ = fs::remove_dir(&test_dir).await; // Best-effort cleanup

        Ok(())
    }

    async fn write_temp(
        temp_path: &Path,
        data: &mut (dyn AsyncRead + Send + Unpin),
    ) -> std::io::Result<u64> {
        let mut file = fs::File::create(temp_path).await?;
        let written = tokio::io::copy(data, &mut file).await?;
        file.flush().await?;

        // rw-r--r--, no execute. Set before the rename so a visible file is final.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o644))
                .await?;
        }

        file.sync_all().await?;
        Ok(written)
    }
}

/// Temporary sibling for an in-progress write: `.{name}.{random}.tmp`.
fn temp_path_for(full_path: &Path) -> PathBuf {
    let name = full_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    full_path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
}

#[async_trait]
impl FileStore for FilesystemBackend {
    async fn save_file(
        &self,
        path: &str,
        data: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<u64> {
        let full_path = self.full_path(path)?;
        debug!(storage_path = %path, full_path = %full_path.display(), "file_storage: save_file");

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "file_storage: create_dir_all failed");
                e
            })?;
        }

        let temp_path = temp_path_for(&full_path);
        let written = match Self::write_temp(&temp_path, data).await {
            Ok(n) => n,
            Err(e) => {
                warn!(temp_path = %temp_path.display(), error = %e, "file_storage: write failed, discarding");
                let _ = fs::remove_file(&temp_path).await;
                return Err(e.into());
            }
        };

        if let Err(e) = fs::rename(&temp_path, &full_path).await {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "file_storage: rename failed");
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(storage_path = %path, size = written, "file_storage: saved");
        Ok(written)
    }

    async fn get_file(&self, path: &str) -> Result<FileReader> {
        let full_path = self.full_path(path)?;
        match fs::File::open(&full_path).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("file {}", path)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        let full_path = self.full_path(path)?;
        fs::remove_file(&full_path).await?;
        debug!(storage_path = %path, "file_storage: deleted");
        Ok(())
    }

    async fn file_exists(&self, path: &str) -> bool {
        let Ok(full_path) = self.full_path(path) else {
            return false;
        };
        match fs::metadata(&full_path).await {
            Ok(meta) => meta.is_file(),
            Err(_) => false,
        }
    }
}
