//! Reconnection delay schedule.

use std::time::Duration;

use deskline_core::config::ReconnectConfig;

/// Exponential backoff derived from [`ReconnectConfig`].
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    enabled: bool,
    initial: Duration,
    max: Duration,
    multiplier: u32,
    max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    /// Builds a policy from configuration.
    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self {
            enabled: config.enabled,
            initial: Duration::from_millis(config.initial_delay_ms),
            max: Duration::from_millis(config.max_delay_ms),
            multiplier: config.multiplier.max(1),
            max_attempts: config.max_attempts,
        }
    }

    /// Whether reconnection is attempted at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether attempt number `attempt` (zero-based) may run.
    pub fn allows(&self, attempt: u32) -> bool {
        self.enabled && self.max_attempts.is_none_or(|max| attempt < max)
    }

    /// Delay before attempt number `attempt` (zero-based), capped at the maximum.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt);
        self.initial.saturating_mul(factor).min(self.max)
    }
}
