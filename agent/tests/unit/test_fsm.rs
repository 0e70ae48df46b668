//! Rollout FSM unit tests

use rolloutd::deploy::fsm::{RolloutEvent, RolloutFsm, RolloutState};

#[test]
fn test_fsm_initial_state() {
    let fsm = RolloutFsm::new();
    assert_eq!(fsm.state(), &RolloutState::Start);
    assert!(fsm.failure().is_none());
    assert!(fsm.probe_attempts().is_none());
    assert!(!fsm.is_terminal());
}

#[test]
fn test_fsm_success_flow() {
    let mut fsm = RolloutFsm::new();

    // Start -> ImagePulled
    fsm.process(RolloutEvent::PullSucceeded).unwrap();
    assert_eq!(fsm.state(), &RolloutState::ImagePulled);

    // ImagePulled -> OldRemoved
    fsm.process(RolloutEvent::RemovalDone).unwrap();
    assert_eq!(fsm.state(), &RolloutState::OldRemoved);

    // OldRemoved -> NewStarted
    fsm.process(RolloutEvent::StartSucceeded).unwrap();
    assert_eq!(fsm.state(), &RolloutState::NewStarted);

    // NewStarted -> HealthChecked
    fsm.process(RolloutEvent::ProbeBegun).unwrap();
    assert_eq!(fsm.state(), &RolloutState::HealthChecked);

    // HealthChecked -> Succeeded
    fsm.process(RolloutEvent::ProbePassed(2)).unwrap();
    assert_eq!(fsm.state(), &RolloutState::Succeeded);
    assert_eq!(fsm.probe_attempts(), Some(2));
    assert!(fsm.is_terminal());
    assert!(fsm.failure().is_none());
}

#[test]
fn test_fsm_pull_failure() {
    let mut fsm = RolloutFsm::new();

    fsm.process(RolloutEvent::PullFailed("unknown tag".to_string()))
        .unwrap();

    assert_eq!(fsm.state(), &RolloutState::Failed);
    assert_eq!(fsm.failure(), Some("pull failed: unknown tag"));
    assert!(fsm.is_terminal());
}

#[test]
fn test_fsm_removal_failure() {
    let mut fsm = RolloutFsm::new();

    fsm.process(RolloutEvent::PullSucceeded).unwrap();
    fsm.process(RolloutEvent::RemovalFailed("engine error".to_string()))
        .unwrap();

    assert_eq!(fsm.state(), &RolloutState::Failed);
    assert_eq!(fsm.failure(), Some("removal failed: engine error"));
}

#[test]
fn test_fsm_start_failure() {
    let mut fsm = RolloutFsm::new();

    fsm.process(RolloutEvent::PullSucceeded).unwrap();
    fsm.process(RolloutEvent::RemovalDone).unwrap();
    fsm.process(RolloutEvent::StartFailed("port already bound".to_string()))
        .unwrap();

    assert_eq!(fsm.state(), &RolloutState::Failed);
    assert_eq!(fsm.failure(), Some("start failed: port already bound"));
}

#[test]
fn test_fsm_probe_exhaustion() {
    let mut fsm = RolloutFsm::new();

    fsm.process(RolloutEvent::PullSucceeded).unwrap();
    fsm.process(RolloutEvent::RemovalDone).unwrap();
    fsm.process(RolloutEvent::StartSucceeded).unwrap();
    fsm.process(RolloutEvent::ProbeBegun).unwrap();
    fsm.process(RolloutEvent::ProbeExhausted(30)).unwrap();

    assert_eq!(fsm.state(), &RolloutState::Failed);
    assert_eq!(fsm.probe_attempts(), Some(30));
    assert_eq!(fsm.failure(), Some("health check failed after 30 attempts"));
}

#[test]
fn test_fsm_invalid_transition() {
    let mut fsm = RolloutFsm::new();

    // Cannot probe before anything was pulled or started
    let result = fsm.process(RolloutEvent::ProbePassed(1));
    assert!(result.is_err());
    // State is unchanged after a rejected event
    assert_eq!(fsm.state(), &RolloutState::Start);
}

#[test]
fn test_fsm_terminal_states_reject_events() {
    let mut fsm = RolloutFsm::new();
    fsm.process(RolloutEvent::PullFailed("gone".to_string())).unwrap();
    assert!(fsm.is_terminal());

    assert!(fsm.process(RolloutEvent::PullSucceeded).is_err());
    assert!(fsm.process(RolloutEvent::RemovalDone).is_err());
    assert_eq!(fsm.state(), &RolloutState::Failed);
}
