//! Orchestrator tests against fake runtime and prober

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use rolloutd::deploy::orchestrator::Orchestrator;
use rolloutd::errors::RolloutError;
use rolloutd::health::{Probe, ProbeOutcome, RetryPolicy};
use rolloutd::journal::{Journal, RotationPolicy};
use rolloutd::models::rollout::{RolloutOutcome, RolloutRequest};
use rolloutd::runtime::{ContainerRuntime, Removal};

/// In-memory container runtime recording every call
#[derive(Default)]
struct FakeRuntime {
    calls: Mutex<Vec<String>>,
    fail_pull: bool,
    fail_remove: bool,
    fail_start: bool,
    container_exists: bool,
    image_backing: Option<String>,
}

impl FakeRuntime {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, op: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(op))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn pull_image(&self, image_ref: &str) -> Result<(), RolloutError> {
        self.record(format!("pull:{}", image_ref));
        if self.fail_pull {
            Err(RolloutError::PullError("network unreachable".to_string()))
        } else {
            Ok(())
        }
    }

    async fn stop_and_remove(&self, container_name: &str) -> Result<Removal, RolloutError> {
        self.record(format!("remove:{}", container_name));
        if self.fail_remove {
            return Err(RolloutError::RemoveError("engine hiccup".to_string()));
        }
        Ok(if self.container_exists {
            Removal::Removed
        } else {
            Removal::NotRunning
        })
    }

    async fn start_from_definition(
        &self,
        base: &Path,
        _overlay: Option<&Path>,
    ) -> Result<(), RolloutError> {
        self.record(format!("start:{}", base.display()));
        if self.fail_start {
            Err(RolloutError::StartError("port already bound".to_string()))
        } else {
            Ok(())
        }
    }

    async fn start_image(
        &self,
        image_ref: &str,
        container_name: &str,
    ) -> Result<(), RolloutError> {
        self.record(format!("start_image:{}:{}", image_ref, container_name));
        Ok(())
    }

    async fn running_image(&self, container_name: &str) -> Result<Option<String>, RolloutError> {
        self.record(format!("inspect:{}", container_name));
        Ok(self.image_backing.clone())
    }

    async fn is_running(&self, _container_name: &str) -> Result<bool, RolloutError> {
        Ok(true)
    }
}

/// Prober returning a fixed outcome
struct FakeProber {
    outcome: ProbeOutcome,
    calls: AtomicU32,
}

impl FakeProber {
    fn new(outcome: ProbeOutcome) -> Self {
        Self {
            outcome,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Probe for FakeProber {
    async fn probe(&self, _url: &str) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome
    }
}

fn request() -> RolloutRequest {
    RolloutRequest {
        image: "review-dashboard".to_string(),
        tag: "v2".to_string(),
        container_name: "review-dashboard".to_string(),
        compose_file: PathBuf::from("/srv/deploy/docker-compose.yml"),
        compose_override: None,
        health_url: "http://localhost:8501/_stcore/health".to_string(),
        retry: RetryPolicy::default(),
        rollback_on_failure: false,
    }
}

async fn journal_in(dir: &tempfile::TempDir) -> Arc<Journal> {
    Arc::new(
        Journal::open(dir.path().join("rollout.log"), RotationPolicy::default())
            .await
            .unwrap(),
    )
}

fn read_journal(dir: &tempfile::TempDir) -> String {
    std::fs::read_to_string(dir.path().join("rollout.log")).unwrap()
}

#[tokio::test]
async fn test_all_phases_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(FakeRuntime {
        container_exists: true,
        ..FakeRuntime::default()
    });
    let prober = Arc::new(FakeProber::new(ProbeOutcome::Healthy { attempts: 1 }));

    let orchestrator = Orchestrator::new(runtime.clone(), prober, journal_in(&dir).await);
    let report = orchestrator.execute(&request()).await.unwrap();

    assert_eq!(report.outcome, RolloutOutcome::Succeeded);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.probe_attempts, Some(1));

    // Phases ran in order: pull, remove, start
    let calls = runtime.calls();
    assert_eq!(calls[0], "pull:review-dashboard:v2");
    assert_eq!(calls[1], "remove:review-dashboard");
    assert_eq!(calls[2], "start:/srv/deploy/docker-compose.yml");

    // Journal records pull/start/health lines in order, plus the marker
    let journal = read_journal(&dir);
    let pull_at = journal.find("pulling image").unwrap();
    let start_at = journal.find("starting container").unwrap();
    let health_at = journal.find("probing health").unwrap();
    assert!(pull_at < start_at && start_at < health_at);
    assert!(journal.contains("SUCCEEDED"));
}

#[tokio::test]
async fn test_pull_failure_leaves_old_container_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(FakeRuntime {
        fail_pull: true,
        container_exists: true,
        ..FakeRuntime::default()
    });
    let prober = Arc::new(FakeProber::new(ProbeOutcome::Healthy { attempts: 1 }));

    let orchestrator = Orchestrator::new(runtime.clone(), prober, journal_in(&dir).await);
    let report = orchestrator.execute(&request()).await.unwrap();

    assert_eq!(report.outcome, RolloutOutcome::Failed);
    assert_eq!(report.exit_code(), 1);

    // Stop/remove and start must never run after a pull failure
    assert_eq!(runtime.count("remove:"), 0);
    assert_eq!(runtime.count("start:"), 0);

    let journal = read_journal(&dir);
    assert!(journal.contains("FAILED: pull failed"));
    assert!(journal.contains("left untouched"));
}

#[tokio::test]
async fn test_missing_container_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(FakeRuntime {
        container_exists: false,
        ..FakeRuntime::default()
    });
    let prober = Arc::new(FakeProber::new(ProbeOutcome::Healthy { attempts: 2 }));

    let orchestrator = Orchestrator::new(runtime, prober, journal_in(&dir).await);
    let report = orchestrator.execute(&request()).await.unwrap();

    assert_eq!(report.outcome, RolloutOutcome::Succeeded);
    let journal = read_journal(&dir);
    assert!(journal.contains("no container named 'review-dashboard' to remove"));
}

#[tokio::test]
async fn test_removal_failure_aborts_before_start() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(FakeRuntime {
        fail_remove: true,
        container_exists: true,
        ..FakeRuntime::default()
    });
    let prober = Arc::new(FakeProber::new(ProbeOutcome::Healthy { attempts: 1 }));

    let orchestrator = Orchestrator::new(runtime.clone(), prober, journal_in(&dir).await);
    let report = orchestrator.execute(&request()).await.unwrap();

    assert_eq!(report.outcome, RolloutOutcome::Failed);
    assert_eq!(runtime.count("start:"), 0);

    let journal = read_journal(&dir);
    assert!(journal.contains("FAILED: removal failed"));
    assert!(journal.contains("manual inspection required"));
}

#[tokio::test]
async fn test_start_failure_flags_service_down() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(FakeRuntime {
        fail_start: true,
        container_exists: true,
        ..FakeRuntime::default()
    });
    let prober = Arc::new(FakeProber::new(ProbeOutcome::Healthy { attempts: 1 }));

    let orchestrator = Orchestrator::new(runtime.clone(), prober, journal_in(&dir).await);
    let report = orchestrator.execute(&request()).await.unwrap();

    assert_eq!(report.outcome, RolloutOutcome::Failed);
    assert_eq!(report.exit_code(), 1);

    let journal = read_journal(&dir);
    assert!(journal.contains("SERVICE DOWN"));
    assert!(journal.contains("FAILED: start failed"));
}

#[tokio::test]
async fn test_health_exhaustion_leaves_container_for_inspection() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(FakeRuntime {
        container_exists: true,
        ..FakeRuntime::default()
    });
    let prober = Arc::new(FakeProber::new(ProbeOutcome::Unhealthy { attempts: 30 }));

    let orchestrator = Orchestrator::new(runtime.clone(), prober, journal_in(&dir).await);
    let report = orchestrator.execute(&request()).await.unwrap();

    assert_eq!(report.outcome, RolloutOutcome::Failed);
    assert_eq!(report.probe_attempts, Some(30));
    assert_eq!(
        report.reason.as_deref(),
        Some("health check failed after 30 attempts")
    );

    // The broken container is not torn down when rollback is off
    assert_eq!(runtime.count("remove:"), 1);
    let journal = read_journal(&dir);
    assert!(journal.contains("left running for inspection"));
    assert!(journal.contains("FAILED"));
}

#[tokio::test]
async fn test_rollback_restarts_previous_image() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(FakeRuntime {
        fail_start: true,
        container_exists: true,
        image_backing: Some("review-dashboard:v1".to_string()),
        ..FakeRuntime::default()
    });
    let prober = Arc::new(FakeProber::new(ProbeOutcome::Healthy { attempts: 1 }));

    let mut req = request();
    req.rollback_on_failure = true;

    let orchestrator = Orchestrator::new(runtime.clone(), prober, journal_in(&dir).await);
    let report = orchestrator.execute(&req).await.unwrap();

    // Rollback does not change the run's outcome
    assert_eq!(report.outcome, RolloutOutcome::Failed);

    let calls = runtime.calls();
    assert!(calls.contains(&"start_image:review-dashboard:v1:review-dashboard".to_string()));

    let journal = read_journal(&dir);
    assert!(journal.contains("attempting rollback to review-dashboard:v1"));
    assert!(journal.contains("rollback complete"));
}

#[tokio::test]
async fn test_invalid_request_is_rejected_before_any_call() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(FakeRuntime::default());
    let prober = Arc::new(FakeProber::new(ProbeOutcome::Healthy { attempts: 1 }));

    let mut req = request();
    req.image = String::new();

    let orchestrator = Orchestrator::new(runtime.clone(), prober, journal_in(&dir).await);
    let result = orchestrator.execute(&req).await;

    assert!(matches!(result, Err(RolloutError::ConfigError(_))));
    assert!(runtime.calls().is_empty());
}
