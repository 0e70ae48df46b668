//! Advisory lock against concurrent rollouts
//!
//! Container operations must not interleave, so a second invocation is
//! rejected outright instead of queued. The lock is cooperative: it only
//! protects against other rolloutd processes honoring the same file.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::errors::RolloutError;

/// Holds the lock file for the lifetime of one rollout; the file is removed
/// on drop.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Acquire the lock, recording this process id in the file.
    ///
    /// Fails with an explicit "already in progress" error when the file
    /// exists; a stale lock is surfaced to the operator rather than stolen.
    pub async fn acquire(path: impl Into<PathBuf>) -> Result<Self, RolloutError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let open_result = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;

        match open_result {
            Ok(mut file) => {
                file.write_all(format!("{}\n", std::process::id()).as_bytes())
                    .await?;
                file.flush().await?;
                debug!("Acquired rollout lock at {}", path.display());
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let holder = tokio::fs::read_to_string(&path)
                    .await
                    .map(|s| s.trim().to_string())
                    .unwrap_or_else(|_| "unknown".to_string());
                warn!(
                    "Rollout lock {} is held by pid {}",
                    path.display(),
                    holder
                );
                Err(RolloutError::LockError(format!(
                    "lock file {} exists (held by pid {}); remove it if no rollout is running",
                    path.display(),
                    holder
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        // Best-effort release; a leftover file is reported on the next acquire
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove lock file {}: {}", self.path.display(), e);
        }
    }
}
