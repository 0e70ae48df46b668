//! Health probing of the deployed service

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::errors::RolloutError;

/// Bounded retry policy for the health probe.
///
/// Fixed interval, no jitter; the worst-case wait is therefore a simple
/// product and auditable up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Sleep between attempts
    pub interval: Duration,

    /// Timeout of a single probe request; keeps a hung endpoint from
    /// stalling the loop past its budget
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// Upper bound on time spent sleeping between attempts
    pub fn worst_case_wait(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Outcome of a probe loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Endpoint answered 2xx on the given attempt
    Healthy { attempts: u32 },

    /// Budget exhausted without a 2xx answer
    Unhealthy { attempts: u32 },
}

/// Seam for substituting the prober in orchestrator tests
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// HTTP health prober
pub struct HealthProber {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl HealthProber {
    pub fn new(policy: RetryPolicy) -> Result<Self, RolloutError> {
        let client = reqwest::Client::builder()
            .timeout(policy.request_timeout)
            .build()?;

        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Poll `url` until it answers 2xx or the budget runs out.
    ///
    /// Sleeping is delegated to `sleep_fn` so tests can run the loop at full
    /// speed; production callers pass `tokio::time::sleep`.
    pub async fn probe_with<S, F>(&self, url: &str, sleep_fn: S) -> ProbeOutcome
    where
        S: Fn(Duration) -> F,
        F: Future<Output = ()>,
    {
        for attempt in 1..=self.policy.max_attempts {
            match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => {
                    info!("Health probe succeeded on attempt {}/{}", attempt, self.policy.max_attempts);
                    return ProbeOutcome::Healthy { attempts: attempt };
                }
                Ok(response) => {
                    debug!(
                        "Health probe attempt {}/{} returned {}",
                        attempt,
                        self.policy.max_attempts,
                        response.status()
                    );
                }
                Err(e) => {
                    debug!(
                        "Health probe attempt {}/{} failed: {}",
                        attempt, self.policy.max_attempts, e
                    );
                }
            }

            if attempt < self.policy.max_attempts {
                sleep_fn(self.policy.interval).await;
            }
        }

        ProbeOutcome::Unhealthy {
            attempts: self.policy.max_attempts,
        }
    }
}

#[async_trait]
impl Probe for HealthProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        self.probe_with(url, tokio::time::sleep).await
    }
}
