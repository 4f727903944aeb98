//! Reconciliation configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Reconciliation tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    /// How long the webhook endpoint waits for reconciliation before acking
    #[serde(default = "default_ack_timeout")]
    pub ack_timeout_secs: u64,

    /// Conditional-update attempts before giving up on a subscription
    #[serde(default = "default_max_update_attempts")]
    pub max_update_attempts: u32,
}

impl ReconciliationConfig {
    /// Ack timeout as Duration
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.ack_timeout_secs)
    }

    /// Validate reconciliation configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ack_timeout_secs == 0 || self.ack_timeout_secs > 60 {
            return Err(ValidationError::InvalidAckTimeout);
        }
        if self.max_update_attempts == 0 || self.max_update_attempts > 10 {
            return Err(ValidationError::InvalidUpdateAttempts);
        }
        Ok(())
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            ack_timeout_secs: default_ack_timeout(),
            max_update_attempts: default_max_update_attempts(),
        }
    }
}

fn default_ack_timeout() -> u64 {
    10
}

fn default_max_update_attempts() -> u32 {
    3
}
