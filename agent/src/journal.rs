//! Append-only rollout journal
//!
//! The journal is the durable audit trail of every phase transition. It is
//! separate from the diagnostic tracing output: tracing can be filtered or
//! redirected, the journal cannot.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::errors::RolloutError;

/// Journal rotation policy
#[derive(Debug, Clone, Copy, Default)]
pub struct RotationPolicy {
    /// Rotate before an append would grow the file past this size;
    /// `None` disables rotation
    pub max_bytes: Option<u64>,
}

/// Append-only journal of `[timestamp] message` lines.
///
/// Opening fails fast: an orchestration without an audit trail must not run.
/// Write errors propagate to the caller, they are never swallowed.
pub struct Journal {
    path: PathBuf,
    rotation: RotationPolicy,
    file: Mutex<File>,
}

impl Journal {
    pub async fn open(
        path: impl Into<PathBuf>,
        rotation: RotationPolicy,
    ) -> Result<Self, RolloutError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            rotation,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line and echo it through tracing.
    pub async fn log(&self, message: &str) -> Result<(), RolloutError> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let line = format!("[{}] {}\n", timestamp, message);

        let mut file = self.file.lock().await;

        if let Some(max_bytes) = self.rotation.max_bytes {
            let len = file.metadata().await?.len();
            if len + line.len() as u64 > max_bytes {
                *file = self.rotate().await?;
            }
        }

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        info!("{}", message);
        Ok(())
    }

    /// Rename the current journal to its `.1` generation and reopen.
    ///
    /// Rotation renames, it never truncates in place; the current generation
    /// stays append-only for its whole lifetime.
    async fn rotate(&self) -> Result<File, RolloutError> {
        let rotated = self.path.with_extension("log.1");
        fs::rename(&self.path, &rotated).await?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        Ok(file)
    }
}
