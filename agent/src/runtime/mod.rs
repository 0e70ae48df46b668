//! Container runtime capability interface
//!
//! The orchestrator only needs a narrow slice of what a container engine can
//! do; keeping it behind a trait lets tests substitute an in-memory fake for
//! the real Docker CLI.

pub mod docker;

use std::path::Path;

use async_trait::async_trait;

use crate::errors::RolloutError;

/// Result of a stop-and-remove call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// An existing container was stopped and removed
    Removed,

    /// No container with that name existed; not an error
    NotRunning,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Fetch the image from its registry. Never retried: an unpullable image
    /// must abort the rollout before the running container is touched.
    async fn pull_image(&self, image_ref: &str) -> Result<(), RolloutError>;

    /// Stop (gracefully, bounded) and remove the named container.
    /// Idempotent: a missing container yields `NotRunning`.
    async fn stop_and_remove(&self, container_name: &str) -> Result<Removal, RolloutError>;

    /// Bring up the service from its declarative definition; overlay values
    /// win over the base on conflicting keys.
    async fn start_from_definition(
        &self,
        base: &Path,
        overlay: Option<&Path>,
    ) -> Result<(), RolloutError>;

    /// Start a container directly from an image reference. Used by the
    /// rollback path, which has no definition to fall back on.
    async fn start_image(&self, image_ref: &str, container_name: &str)
        -> Result<(), RolloutError>;

    /// Image reference currently backing the named container, if any.
    async fn running_image(&self, container_name: &str) -> Result<Option<String>, RolloutError>;

    /// Whether a container with that name is currently running.
    async fn is_running(&self, container_name: &str) -> Result<bool, RolloutError>;
}
