//! Docker CLI runtime implementation

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::RolloutError;
use crate::runtime::{ContainerRuntime, Removal};

/// Container runtime backed by the `docker` CLI
pub struct DockerCli {
    /// Seconds a container gets to stop gracefully before SIGKILL
    stop_grace_secs: u32,
}

impl DockerCli {
    pub fn new() -> Self {
        Self { stop_grace_secs: 30 }
    }

    /// Whether a container with the given name exists, running or stopped
    async fn container_exists(&self, container_name: &str) -> Result<bool, RolloutError> {
        let filter = format!("name=^/{}$", container_name);
        let output = Command::new("docker")
            .args(["ps", "-a", "--filter", &filter, "--format", "{{.Names}}"])
            .output()
            .await
            .map_err(|e| RolloutError::RemoveError(format!("failed to run docker ps: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RolloutError::RemoveError(format!(
                "docker ps failed: {}",
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().any(|name| name.trim() == container_name))
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn pull_image(&self, image_ref: &str) -> Result<(), RolloutError> {
        info!("Pulling image: {}", image_ref);

        let output = Command::new("docker")
            .args(["pull", image_ref])
            .output()
            .await
            .map_err(|e| RolloutError::PullError(format!("failed to run docker pull: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RolloutError::PullError(format!(
                "{}: {}",
                image_ref,
                stderr.trim()
            )));
        }

        Ok(())
    }

    async fn stop_and_remove(&self, container_name: &str) -> Result<Removal, RolloutError> {
        if !self.container_exists(container_name).await? {
            debug!("No container named {} to remove", container_name);
            return Ok(Removal::NotRunning);
        }

        info!("Stopping container: {}", container_name);
        let grace = self.stop_grace_secs.to_string();
        let output = Command::new("docker")
            .args(["stop", "-t", &grace, container_name])
            .output()
            .await
            .map_err(|e| RolloutError::RemoveError(format!("failed to run docker stop: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RolloutError::RemoveError(format!(
                "docker stop {} failed: {}",
                container_name,
                stderr.trim()
            )));
        }

        let output = Command::new("docker")
            .args(["rm", container_name])
            .output()
            .await
            .map_err(|e| RolloutError::RemoveError(format!("failed to run docker rm: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RolloutError::RemoveError(format!(
                "docker rm {} failed: {}",
                container_name,
                stderr.trim()
            )));
        }

        Ok(Removal::Removed)
    }

    async fn start_from_definition(
        &self,
        base: &Path,
        overlay: Option<&Path>,
    ) -> Result<(), RolloutError> {
        if !base.exists() {
            return Err(RolloutError::StartError(format!(
                "service definition not found: {}",
                base.display()
            )));
        }

        let mut file_args: Vec<String> =
            vec!["-f".to_string(), base.to_string_lossy().into_owned()];
        match overlay {
            Some(path) if path.exists() => {
                file_args.push("-f".to_string());
                file_args.push(path.to_string_lossy().into_owned());
            }
            Some(path) => {
                debug!(
                    "Overlay {} not present, using base definition only",
                    path.display()
                );
            }
            None => {}
        }

        info!("Starting service from definition: {}", base.display());

        // Run docker compose up -d
        let status = Command::new("docker")
            .arg("compose")
            .args(&file_args)
            .args(["up", "-d"])
            .status()
            .await
            .map_err(|e| {
                RolloutError::StartError(format!("failed to run docker compose: {}", e))
            })?;

        if !status.success() {
            // Try the legacy docker-compose binary
            debug!("docker compose failed, trying 'docker-compose'...");
            let status = Command::new("docker-compose")
                .args(&file_args)
                .args(["up", "-d"])
                .status()
                .await
                .map_err(|e| {
                    RolloutError::StartError(format!("failed to run docker-compose: {}", e))
                })?;

            if !status.success() {
                return Err(RolloutError::StartError(format!(
                    "compose up failed for {}",
                    base.display()
                )));
            }
        }

        Ok(())
    }

    async fn start_image(
        &self,
        image_ref: &str,
        container_name: &str,
    ) -> Result<(), RolloutError> {
        info!(
            "Starting container {} from image {}",
            container_name, image_ref
        );

        let status = Command::new("docker")
            .args([
                "run",
                "-d",
                "--name",
                container_name,
                "--restart",
                "unless-stopped",
                image_ref,
            ])
            .status()
            .await
            .map_err(|e| RolloutError::StartError(format!("failed to run docker run: {}", e)))?;

        if !status.success() {
            return Err(RolloutError::StartError(format!(
                "docker run failed for {}",
                image_ref
            )));
        }

        Ok(())
    }

    async fn running_image(&self, container_name: &str) -> Result<Option<String>, RolloutError> {
        let output = Command::new("docker")
            .args(["inspect", "--format", "{{.Config.Image}}", container_name])
            .output()
            .await
            .map_err(|e| RolloutError::Internal(format!("failed to run docker inspect: {}", e)))?;

        if !output.status.success() {
            return Ok(None);
        }

        let image = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if image.is_empty() { None } else { Some(image) })
    }

    async fn is_running(&self, container_name: &str) -> Result<bool, RolloutError> {
        let filter = format!("name=^/{}$", container_name);
        let output = Command::new("docker")
            .args(["ps", "--filter", &filter, "--format", "{{.Names}}"])
            .output()
            .await
            .map_err(|e| RolloutError::Internal(format!("failed to run docker ps: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RolloutError::Internal(format!(
                "docker ps failed: {}",
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().any(|name| name.trim() == container_name))
    }
}
