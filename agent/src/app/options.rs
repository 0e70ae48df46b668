//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::health::RetryPolicy;
use crate::journal::RotationPolicy;
use crate::models::rollout::RolloutRequest;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// The rollout this invocation performs
    pub request: RolloutRequest,

    /// Storage paths (journal, lock, logs)
    pub layout: StorageLayout,

    /// Journal rotation policy
    pub rotation: RotationPolicy,

    /// Webhook receiver configuration
    pub server: ServerOptions,
}

impl AppOptions {
    /// Assemble options from the settings file.
    ///
    /// Relative compose paths are resolved against the configured deploy
    /// directory; `settings_path` is forwarded to the rollout subprocess the
    /// webhook receiver spawns.
    pub fn from_settings(
        settings: &Settings,
        layout: StorageLayout,
        settings_path: Option<PathBuf>,
    ) -> Self {
        let rollout = &settings.rollout;

        let resolve = |path: &PathBuf| -> PathBuf {
            if path.is_absolute() {
                path.clone()
            } else {
                rollout.deploy_dir.join(path)
            }
        };

        let request = RolloutRequest {
            image: rollout.image.clone(),
            tag: rollout.tag.clone(),
            container_name: rollout.container_name.clone(),
            compose_file: resolve(&rollout.compose_file),
            compose_override: rollout.compose_override.as_ref().map(&resolve),
            health_url: rollout.health_url.clone(),
            retry: RetryPolicy {
                max_attempts: rollout.max_attempts,
                interval: Duration::from_secs(rollout.interval_secs),
                request_timeout: Duration::from_secs(rollout.request_timeout_secs),
            },
            rollback_on_failure: rollout.rollback_on_failure,
        };

        Self {
            request,
            layout,
            rotation: RotationPolicy {
                max_bytes: rollout.journal_max_bytes,
            },
            server: ServerOptions {
                host: settings.webhook.host.clone(),
                port: settings.webhook.port,
                secret: settings.webhook.secret_token.clone(),
                settings_path,
            },
        }
    }
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default(), StorageLayout::default(), None)
    }
}

/// Webhook receiver options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Shared secret expected in the trigger header
    pub secret: SecretString,

    /// Settings file override, forwarded to the rollout subprocess
    pub settings_path: Option<PathBuf>,
}
