//! Async filesystem helpers used by the pipeline.
//!
//! Thin wrappers over `tokio::fs` that attach the offending path to every
//! error and give the few compound operations the pipeline needs (write with
//! parent creation, recursive copy, remove-if-present).

use crate::error::{MigrateError, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Create `dir` and all missing parents.
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| MigrateError::io(dir, e))
}

/// `true` if `path` exists. Permission errors count as "does not exist".
pub async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Write `data` to `path`, creating parent directories first.
pub async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent).await?;
    }
    tokio::fs::write(path, data)
        .await
        .map_err(|e| MigrateError::io(path, e))
}

/// Recursively remove `dir`. A missing directory is not an error.
pub async fn remove_dir_all_if_exists(dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            debug!("Removed {}", dir.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MigrateError::io(dir, e)),
    }
}

/// Recursively copy `source` into `destination`, creating it as needed.
///
/// Existing files at the destination are overwritten; extra files are kept.
pub async fn copy_dir_all(source: &Path, destination: &Path) -> Result<()> {
    copy_dir_boxed(source.to_path_buf(), destination.to_path_buf()).await
}

fn copy_dir_boxed(source: PathBuf, destination: PathBuf) -> BoxFuture<'static, Result<()>> {
    async move {
        ensure_dir(&destination).await?;
        let mut entries = tokio::fs::read_dir(&source)
            .await
            .map_err(|e| MigrateError::io(&source, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MigrateError::io(&source, e))?
        {
            let from = entry.path();
            let to = destination.join(entry.file_name());
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| MigrateError::io(&from, e))?;

            if file_type.is_dir() {
                copy_dir_boxed(from, to).await?;
            } else {
                tokio::fs::copy(&from, &to)
                    .await
                    .map_err(|e| MigrateError::io(&from, e))?;
            }
        }
        Ok(())
    }
    .boxed()
}
