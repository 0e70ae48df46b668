//! Server state

use std::sync::Arc;

use secrecy::SecretString;

use crate::server::invoker::RolloutInvoker;

/// Server state shared across handlers
pub struct ServerState {
    /// Shared secret expected in the trigger header
    pub secret: SecretString,

    /// How an accepted trigger runs the rollout
    pub invoker: Arc<dyn RolloutInvoker>,
}

impl ServerState {
    pub fn new(secret: SecretString, invoker: Arc<dyn RolloutInvoker>) -> Self {
        Self { secret, invoker }
    }
}
