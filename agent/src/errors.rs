//! Error types for rolloutd

use thiserror::Error;

/// Main error type for the rollout orchestrator
#[derive(Error, Debug)]
pub enum RolloutError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Image pull failed: {0}")]
    PullError(String),

    #[error("Container removal failed: {0}")]
    RemoveError(String),

    #[error("Container start failed: {0}")]
    StartError(String),

    #[error("Health check failed after {attempts} attempts")]
    HealthError { attempts: u32 },

    #[error("Rollout already in progress: {0}")]
    LockError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Invalid state transition: {0}")]
    TransitionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for RolloutError {
    fn from(err: anyhow::Error) -> Self {
        RolloutError::Internal(err.to_string())
    }
}
