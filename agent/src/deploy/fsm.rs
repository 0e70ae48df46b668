//! Finite State Machine for one rollout run

use serde::{Deserialize, Serialize};

use crate::errors::RolloutError;

/// Rollout phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloutState {
    /// Initial state, nothing touched yet
    Start,

    /// New image fetched from the registry
    ImagePulled,

    /// Previous container stopped and removed (or none existed)
    OldRemoved,

    /// New container started from its definition
    NewStarted,

    /// Health probing in progress
    HealthChecked,

    /// Terminal: rollout complete and service live
    Succeeded,

    /// Terminal: rollout aborted
    Failed,
}

/// Rollout event
#[derive(Debug, Clone)]
pub enum RolloutEvent {
    /// Image pull completed
    PullSucceeded,

    /// Image pull failed; the old container is untouched
    PullFailed(String),

    /// Old container removed, or none existed
    RemovalDone,

    /// Removing the old container failed unexpectedly
    RemovalFailed(String),

    /// New container started
    StartSucceeded,

    /// New container failed to start; the service is down
    StartFailed(String),

    /// Health probing has begun
    ProbeBegun,

    /// Probe answered 2xx within budget
    ProbePassed(u32),

    /// Probe budget exhausted
    ProbeExhausted(u32),
}

/// Rollout FSM
#[derive(Debug, Clone)]
pub struct RolloutFsm {
    state: RolloutState,
    failure: Option<String>,
    probe_attempts: Option<u32>,
}

impl RolloutFsm {
    /// Create a new FSM in the start state
    pub fn new() -> Self {
        Self {
            state: RolloutState::Start,
            failure: None,
            probe_attempts: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> &RolloutState {
        &self.state
    }

    /// Get failure reason if any
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Probe attempts made, once probing finished
    pub fn probe_attempts(&self) -> Option<u32> {
        self.probe_attempts
    }

    /// Whether a terminal state has been reached
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, RolloutState::Succeeded | RolloutState::Failed)
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: RolloutEvent) -> Result<(), RolloutError> {
        let new_state = match (&self.state, &event) {
            // From Start
            (RolloutState::Start, RolloutEvent::PullSucceeded) => RolloutState::ImagePulled,
            (RolloutState::Start, RolloutEvent::PullFailed(reason)) => {
                self.failure = Some(format!("pull failed: {}", reason));
                RolloutState::Failed
            }

            // From ImagePulled
            (RolloutState::ImagePulled, RolloutEvent::RemovalDone) => RolloutState::OldRemoved,
            (RolloutState::ImagePulled, RolloutEvent::RemovalFailed(reason)) => {
                self.failure = Some(format!("removal failed: {}", reason));
                RolloutState::Failed
            }

            // From OldRemoved
            (RolloutState::OldRemoved, RolloutEvent::StartSucceeded) => RolloutState::NewStarted,
            (RolloutState::OldRemoved, RolloutEvent::StartFailed(reason)) => {
                self.failure = Some(format!("start failed: {}", reason));
                RolloutState::Failed
            }

            // From NewStarted
            (RolloutState::NewStarted, RolloutEvent::ProbeBegun) => RolloutState::HealthChecked,

            // From HealthChecked
            (RolloutState::HealthChecked, RolloutEvent::ProbePassed(attempts)) => {
                self.probe_attempts = Some(*attempts);
                RolloutState::Succeeded
            }
            (RolloutState::HealthChecked, RolloutEvent::ProbeExhausted(attempts)) => {
                self.probe_attempts = Some(*attempts);
                self.failure = Some(format!("health check failed after {} attempts", attempts));
                RolloutState::Failed
            }

            // Invalid transitions, including any event after a terminal state
            (state, event) => {
                return Err(RolloutError::TransitionError(format!(
                    "{:?} -> {:?}",
                    state, event
                )));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for RolloutFsm {
    fn default() -> Self {
        Self::new()
    }
}
