//! Application entry points for both modes

use std::future::Future;
use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing::info;

use crate::app::options::AppOptions;
use crate::deploy::orchestrator::Orchestrator;
use crate::errors::RolloutError;
use crate::health::HealthProber;
use crate::journal::Journal;
use crate::lock::LockFile;
use crate::models::rollout::RolloutReport;
use crate::runtime::docker::DockerCli;
use crate::server::invoker::SubprocessInvoker;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run one rollout to a terminal state.
///
/// The journal is opened before anything else: no audit trail, no rollout.
/// The advisory lock is held for the whole run and released on return.
pub async fn run_rollout(options: &AppOptions) -> Result<RolloutReport, RolloutError> {
    options.layout.setup().await?;

    let journal = Arc::new(Journal::open(options.layout.journal_file(), options.rotation).await?);
    let _lock = LockFile::acquire(options.layout.lock_file()).await?;

    let runtime = Arc::new(DockerCli::new());
    let prober = Arc::new(HealthProber::new(options.request.retry)?);

    let orchestrator = Orchestrator::new(runtime, prober, journal);
    orchestrator.execute(&options.request).await
}

/// Run the webhook receiver until the shutdown signal resolves.
pub async fn run_server(
    options: &AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), RolloutError> {
    if options.server.secret.expose_secret().is_empty() {
        return Err(RolloutError::ConfigError(
            "webhook secret_token is not configured; refusing to accept triggers".to_string(),
        ));
    }

    options.layout.setup().await?;

    let invoker = SubprocessInvoker::for_current_exe(options.server.settings_path.clone())?;
    let state = Arc::new(ServerState::new(
        options.server.secret.clone(),
        Arc::new(invoker),
    ));

    let handle = serve(&options.server, state, shutdown_signal).await?;

    info!("Webhook receiver running; POST /hooks/rollout triggers a deployment");

    handle
        .await
        .map_err(|e| RolloutError::ServerError(e.to_string()))?
}
