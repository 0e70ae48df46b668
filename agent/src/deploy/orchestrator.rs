//! Rollout orchestrator
//!
//! Sequences pull -> stop/remove -> start -> health check through the rollout
//! FSM, journaling every phase transition. All phases are strictly sequential;
//! a failure in any of the first three is immediately terminal for the run.

use std::sync::Arc;

use tracing::{error, info};

use crate::deploy::fsm::{RolloutEvent, RolloutFsm};
use crate::errors::RolloutError;
use crate::health::{Probe, ProbeOutcome};
use crate::journal::Journal;
use crate::models::rollout::{RolloutReport, RolloutRequest};
use crate::runtime::{ContainerRuntime, Removal};

/// Drives one rollout from start to a terminal state
pub struct Orchestrator {
    runtime: Arc<dyn ContainerRuntime>,
    prober: Arc<dyn Probe>,
    journal: Arc<Journal>,
}

impl Orchestrator {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        prober: Arc<dyn Probe>,
        journal: Arc<Journal>,
    ) -> Self {
        Self {
            runtime,
            prober,
            journal,
        }
    }

    /// Execute one rollout.
    ///
    /// A failed rollout is a normal `Ok(report)` with a `Failed` outcome;
    /// `Err` means the orchestrator itself could not proceed (journal write
    /// failure, invalid request).
    pub async fn execute(&self, request: &RolloutRequest) -> Result<RolloutReport, RolloutError> {
        request.validate()?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let image_ref = request.image_ref();
        let mut fsm = RolloutFsm::new();

        self.journal
            .log(&format!(
                "rollout {}: starting rollout of {} into container '{}'",
                run_id, image_ref, request.container_name
            ))
            .await?;

        // Capture what is currently running before anything is touched, so
        // the rollback path has a target
        let previous_image = if request.rollback_on_failure {
            self.runtime
                .running_image(&request.container_name)
                .await
                .unwrap_or(None)
        } else {
            None
        };

        // Phase 1: pull. The old container keeps serving until this succeeds.
        self.journal
            .log(&format!("rollout {}: pulling image {}", run_id, image_ref))
            .await?;
        if let Err(e) = self.runtime.pull_image(&image_ref).await {
            fsm.process(RolloutEvent::PullFailed(e.to_string()))?;
            self.journal
                .log(&format!(
                    "rollout {}: existing container left untouched",
                    run_id
                ))
                .await?;
            return self.finish_failed(&run_id, &fsm).await;
        }
        fsm.process(RolloutEvent::PullSucceeded)?;
        self.journal
            .log(&format!("rollout {}: image {} pulled", run_id, image_ref))
            .await?;

        // Phase 2: clear out the old container
        match self.runtime.stop_and_remove(&request.container_name).await {
            Ok(Removal::Removed) => {
                self.journal
                    .log(&format!(
                        "rollout {}: stopped and removed container '{}'",
                        run_id, request.container_name
                    ))
                    .await?;
            }
            Ok(Removal::NotRunning) => {
                self.journal
                    .log(&format!(
                        "rollout {}: no container named '{}' to remove",
                        run_id, request.container_name
                    ))
                    .await?;
            }
            Err(e) => {
                fsm.process(RolloutEvent::RemovalFailed(e.to_string()))?;
                self.journal
                    .log(&format!(
                        "rollout {}: container state is ambiguous, manual inspection required",
                        run_id
                    ))
                    .await?;
                return self.finish_failed(&run_id, &fsm).await;
            }
        }
        fsm.process(RolloutEvent::RemovalDone)?;

        // Phase 3: start the replacement
        self.journal
            .log(&format!(
                "rollout {}: starting container from {}",
                run_id,
                request.compose_file.display()
            ))
            .await?;
        if let Err(e) = self
            .runtime
            .start_from_definition(&request.compose_file, request.compose_override.as_deref())
            .await
        {
            fsm.process(RolloutEvent::StartFailed(e.to_string()))?;
            error!("Service is down: new container failed to start after the old one was removed");
            self.journal
                .log(&format!(
                    "rollout {}: SERVICE DOWN: start failed after the old container was removed: {}",
                    run_id, e
                ))
                .await?;
            self.try_rollback(&run_id, request, previous_image.as_deref())
                .await?;
            return self.finish_failed(&run_id, &fsm).await;
        }
        fsm.process(RolloutEvent::StartSucceeded)?;
        self.journal
            .log(&format!("rollout {}: new container started", run_id))
            .await?;

        // Phase 4: wait for the service to come up
        fsm.process(RolloutEvent::ProbeBegun)?;
        self.journal
            .log(&format!(
                "rollout {}: probing health at {} (up to {} attempts every {}s)",
                run_id,
                request.health_url,
                request.retry.max_attempts,
                request.retry.interval.as_secs()
            ))
            .await?;

        match self.prober.probe(&request.health_url).await {
            ProbeOutcome::Healthy { attempts } => {
                fsm.process(RolloutEvent::ProbePassed(attempts))?;
                self.journal
                    .log(&format!(
                        "rollout {}: health check passed after {} attempt(s)",
                        run_id, attempts
                    ))
                    .await?;
                self.journal
                    .log(&format!(
                        "rollout {}: SUCCEEDED: container '{}' is live",
                        run_id, request.container_name
                    ))
                    .await?;
                info!("Rollout {} succeeded", run_id);
                Ok(RolloutReport::succeeded(run_id, attempts))
            }
            ProbeOutcome::Unhealthy { attempts } => {
                fsm.process(RolloutEvent::ProbeExhausted(attempts))?;
                if request.rollback_on_failure {
                    self.try_rollback(&run_id, request, previous_image.as_deref())
                        .await?;
                } else {
                    // Left running on purpose so the operator can read its logs
                    self.journal
                        .log(&format!(
                            "rollout {}: container left running for inspection",
                            run_id
                        ))
                        .await?;
                }
                self.finish_failed(&run_id, &fsm).await
            }
        }
    }

    /// Journal the terminal FAILED line and build the report
    async fn finish_failed(
        &self,
        run_id: &str,
        fsm: &RolloutFsm,
    ) -> Result<RolloutReport, RolloutError> {
        let reason = fsm.failure().unwrap_or("unknown failure").to_string();
        self.journal
            .log(&format!("rollout {}: FAILED: {}", run_id, reason))
            .await?;
        error!("Rollout {} failed: {}", run_id, reason);
        Ok(RolloutReport::failed(
            run_id.to_string(),
            reason,
            fsm.probe_attempts(),
        ))
    }

    /// Best-effort restart of the previously running image.
    ///
    /// Only invoked when the rollback option is enabled and the run failed
    /// after the old container was removed. A successful rollback does not
    /// change the run's outcome; the rollout itself still failed.
    async fn try_rollback(
        &self,
        run_id: &str,
        request: &RolloutRequest,
        previous_image: Option<&str>,
    ) -> Result<(), RolloutError> {
        if !request.rollback_on_failure {
            return Ok(());
        }

        let Some(image) = previous_image else {
            self.journal
                .log(&format!(
                    "rollout {}: rollback requested but no previous image was recorded",
                    run_id
                ))
                .await?;
            return Ok(());
        };

        self.journal
            .log(&format!("rollout {}: attempting rollback to {}", run_id, image))
            .await?;

        if let Err(e) = self.runtime.stop_and_remove(&request.container_name).await {
            self.journal
                .log(&format!(
                    "rollout {}: rollback could not clear the failed container: {}",
                    run_id, e
                ))
                .await?;
            return Ok(());
        }

        match self
            .runtime
            .start_image(image, &request.container_name)
            .await
        {
            Ok(()) => {
                self.journal
                    .log(&format!(
                        "rollout {}: rollback complete, {} running again",
                        run_id, image
                    ))
                    .await?;
            }
            Err(e) => {
                self.journal
                    .log(&format!("rollout {}: rollback failed: {}", run_id, e))
                    .await?;
            }
        }

        Ok(())
    }
}
