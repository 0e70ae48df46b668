//! Rollout models

use std::path::PathBuf;

use serde::Serialize;

use crate::errors::RolloutError;
use crate::health::RetryPolicy;

/// Everything one rollout attempt needs, fixed at invocation time.
#[derive(Debug, Clone)]
pub struct RolloutRequest {
    /// Image name (without tag)
    pub image: String,

    /// Image tag to deploy
    pub tag: String,

    /// Name of the managed container
    pub container_name: String,

    /// Base service definition
    pub compose_file: PathBuf,

    /// Optional environment overlay merged over the base definition
    pub compose_override: Option<PathBuf>,

    /// Liveness endpoint of the deployed service
    pub health_url: String,

    /// Probe retry budget
    pub retry: RetryPolicy,

    /// Restart the previous image when the run fails after removal
    pub rollback_on_failure: bool,
}

impl RolloutRequest {
    /// Full image reference, `name:tag`
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }

    /// Validate the request before any container operation runs
    pub fn validate(&self) -> Result<(), RolloutError> {
        if self.image.is_empty() {
            return Err(RolloutError::ConfigError("image must not be empty".to_string()));
        }
        if self.tag.is_empty() {
            return Err(RolloutError::ConfigError("tag must not be empty".to_string()));
        }
        if self.container_name.is_empty() {
            return Err(RolloutError::ConfigError(
                "container_name must not be empty".to_string(),
            ));
        }
        if self.compose_file.as_os_str().is_empty() {
            return Err(RolloutError::ConfigError(
                "compose_file must not be empty".to_string(),
            ));
        }
        url::Url::parse(&self.health_url)
            .map_err(|e| RolloutError::ConfigError(format!("invalid health_url: {}", e)))?;
        if self.retry.max_attempts == 0 {
            return Err(RolloutError::ConfigError(
                "retry budget must allow at least one attempt".to_string(),
            ));
        }
        Ok(())
    }
}

/// Terminal outcome of one rollout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RolloutOutcome {
    Succeeded,
    Failed,
}

/// Report produced at the end of one rollout attempt
#[derive(Debug, Clone, Serialize)]
pub struct RolloutReport {
    /// Unique id of this run, also present in every journal line
    pub run_id: String,

    /// Terminal outcome
    pub outcome: RolloutOutcome,

    /// Failure reason, absent on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Health probe attempts made, when probing ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_attempts: Option<u32>,
}

impl RolloutReport {
    pub fn succeeded(run_id: String, probe_attempts: u32) -> Self {
        Self {
            run_id,
            outcome: RolloutOutcome::Succeeded,
            reason: None,
            probe_attempts: Some(probe_attempts),
        }
    }

    pub fn failed(run_id: String, reason: String, probe_attempts: Option<u32>) -> Self {
        Self {
            run_id,
            outcome: RolloutOutcome::Failed,
            reason: Some(reason),
            probe_attempts,
        }
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            RolloutOutcome::Succeeded => 0,
            RolloutOutcome::Failed => 1,
        }
    }
}
