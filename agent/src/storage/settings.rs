//! Settings file management

use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;

use crate::logs::LogLevel;

/// Orchestrator settings.
///
/// Settings are read from disk, never written back, so only `Deserialize` is
/// derived; the webhook secret must not end up re-serialized anywhere.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit diagnostic logs as JSON
    #[serde(default)]
    pub json_logs: bool,

    /// Rollout configuration
    #[serde(default)]
    pub rollout: RolloutSettings,

    /// Webhook receiver configuration
    #[serde(default)]
    pub webhook: WebhookSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            json_logs: false,
            rollout: RolloutSettings::default(),
            webhook: WebhookSettings::default(),
        }
    }
}

/// Rollout configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RolloutSettings {
    /// Image name (without tag)
    #[serde(default = "default_image")]
    pub image: String,

    /// Image tag to deploy
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Name of the managed container
    #[serde(default = "default_container_name")]
    pub container_name: String,

    /// Directory holding the service definition files
    #[serde(default = "default_deploy_dir")]
    pub deploy_dir: PathBuf,

    /// Base compose file, absolute or relative to `deploy_dir`
    #[serde(default = "default_compose_file")]
    pub compose_file: PathBuf,

    /// Optional overlay compose file; skipped when absent on disk
    #[serde(default = "default_compose_override")]
    pub compose_override: Option<PathBuf>,

    /// Liveness endpoint of the deployed service
    #[serde(default = "default_health_url")]
    pub health_url: String,

    /// Total health probe attempts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Seconds between probe attempts
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Per-probe request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Restart the previously running image when a run fails after the old
    /// container was removed
    #[serde(default)]
    pub rollback_on_failure: bool,

    /// Rotate the journal once it grows past this size; `null` disables rotation
    #[serde(default = "default_journal_max_bytes")]
    pub journal_max_bytes: Option<u64>,
}

fn default_image() -> String {
    "review-dashboard".to_string()
}

fn default_tag() -> String {
    "latest".to_string()
}

fn default_container_name() -> String {
    "review-dashboard".to_string()
}

fn default_deploy_dir() -> PathBuf {
    PathBuf::from("/volume1/docker/review-dashboard")
}

fn default_compose_file() -> PathBuf {
    PathBuf::from("docker-compose.yml")
}

fn default_compose_override() -> Option<PathBuf> {
    Some(PathBuf::from("docker-compose.prod.yml"))
}

fn default_health_url() -> String {
    "http://localhost:8501/_stcore/health".to_string()
}

fn default_max_attempts() -> u32 {
    30
}

fn default_interval_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    3
}

fn default_journal_max_bytes() -> Option<u64> {
    Some(10 * 1024 * 1024)
}

impl Default for RolloutSettings {
    fn default() -> Self {
        Self {
            image: default_image(),
            tag: default_tag(),
            container_name: default_container_name(),
            deploy_dir: default_deploy_dir(),
            compose_file: default_compose_file(),
            compose_override: default_compose_override(),
            health_url: default_health_url(),
            max_attempts: default_max_attempts(),
            interval_secs: default_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            rollback_on_failure: false,
            journal_max_bytes: default_journal_max_bytes(),
        }
    }
}

/// Webhook receiver settings
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSettings {
    /// Host to bind to
    #[serde(default = "default_webhook_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_webhook_port")]
    pub port: u16,

    /// Shared secret expected in the trigger header; serve mode refuses to
    /// start while this is empty
    #[serde(default = "default_secret_token")]
    pub secret_token: SecretString,
}

fn default_webhook_host() -> String {
    "0.0.0.0".to_string()
}

fn default_webhook_port() -> u16 {
    9000
}

fn default_secret_token() -> SecretString {
    SecretString::from(String::new())
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            host: default_webhook_host(),
            port: default_webhook_port(),
            secret_token: default_secret_token(),
        }
    }
}
