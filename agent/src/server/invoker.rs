//! Rollout subprocess invocation

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::errors::RolloutError;

/// Seam between the webhook receiver and the rollout process, so handler
/// tests can count invocations without spawning anything.
#[async_trait]
pub trait RolloutInvoker: Send + Sync {
    /// Run one rollout to completion and return its exit code.
    async fn invoke(&self) -> Result<i32, RolloutError>;
}

/// Invoker that spawns the orchestrator as a subprocess.
///
/// The receiver deliberately does not run the rollout in-process: the
/// subprocess owns the advisory lock, its own journal handle, and its exit
/// code, exactly as a manual CLI invocation would.
pub struct SubprocessInvoker {
    program: PathBuf,
    args: Vec<String>,
}

impl SubprocessInvoker {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Invoker running this same binary in one-shot mode, forwarding the
    /// settings file override when one was given.
    pub fn for_current_exe(settings_path: Option<PathBuf>) -> Result<Self, RolloutError> {
        let program = std::env::current_exe()
            .map_err(|e| RolloutError::ServerError(format!("cannot locate own binary: {}", e)))?;

        let args = settings_path
            .map(|p| vec![format!("--settings={}", p.display())])
            .unwrap_or_default();

        Ok(Self::new(program, args))
    }
}

#[async_trait]
impl RolloutInvoker for SubprocessInvoker {
    async fn invoke(&self) -> Result<i32, RolloutError> {
        info!("Spawning rollout subprocess: {}", self.program.display());

        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .await
            .map_err(|e| {
                RolloutError::ServerError(format!("failed to spawn rollout subprocess: {}", e))
            })?;

        // A signal-killed subprocess has no code; report it as failed
        Ok(status.code().unwrap_or(1))
    }
}
