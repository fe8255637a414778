//! Realtime connection configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Realtime (WebSocket) client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Base URL of the realtime endpoint.
    #[serde(default = "default_url")]
    pub url: String,
    /// How long a typing indicator lives without renewal, in milliseconds.
    #[serde(default = "default_typing_expiry")]
    pub typing_expiry_ms: u64,
    /// Handshake timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Outbound frame buffer per connection.
    #[serde(default = "default_buffer")]
    pub outbound_buffer_size: usize,
    /// Inbound frame buffer per connection.
    #[serde(default = "default_buffer")]
    pub inbound_buffer_size: usize,
    /// Capacity of the session update broadcast channel.
    #[serde(default = "default_update_buffer")]
    pub update_buffer_size: usize,
    /// Inbound frames larger than this are dropped.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    /// Reconnection policy after an established connection drops.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Reconnection backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Whether dropped connections are reopened automatically.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Delay before the first attempt, in milliseconds.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// Growth factor applied per attempt.
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
    /// Give up after this many failed attempts (`None` = never).
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl RealtimeConfig {
    /// Typing expiry as a [`Duration`].
    pub fn typing_expiry(&self) -> Duration {
        Duration::from_millis(self.typing_expiry_ms)
    }

    /// Handshake timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Checks the settings for values the engine cannot work with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.url.trim().is_empty() {
            return Err(AppError::configuration("realtime.url must not be empty"));
        }
        if self.typing_expiry_ms == 0 {
            return Err(AppError::configuration(
                "realtime.typing_expiry_ms must be greater than zero",
            ));
        }
        if self.outbound_buffer_size == 0
            || self.inbound_buffer_size == 0
            || self.update_buffer_size == 0
        {
            return Err(AppError::configuration(
                "realtime buffer sizes must be greater than zero",
            ));
        }
        if self.reconnect.initial_delay_ms > self.reconnect.max_delay_ms {
            return Err(AppError::configuration(format!(
                "realtime.reconnect.initial_delay_ms ({}) exceeds max_delay_ms ({})",
                self.reconnect.initial_delay_ms, self.reconnect.max_delay_ms
            )));
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            typing_expiry_ms: default_typing_expiry(),
            connect_timeout_seconds: default_connect_timeout(),
            outbound_buffer_size: default_buffer(),
            inbound_buffer_size: default_buffer(),
            update_buffer_size: default_update_buffer(),
            max_frame_bytes: default_max_frame_bytes(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
            max_attempts: None,
        }
    }
}

fn default_url() -> String {
    "ws://localhost:8000/socket".to_string()
}

fn default_typing_expiry() -> u64 {
    3000
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_buffer() -> usize {
    256
}

fn default_update_buffer() -> usize {
    128
}

fn default_max_frame_bytes() -> usize {
    65_536
}

fn default_true() -> bool {
    true
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_multiplier() -> u32 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config: RealtimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.typing_expiry(), Duration::from_millis(3000));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert!(config.reconnect.enabled);
        assert_eq!(config.reconnect.max_attempts, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_reconnect_section() {
        let config: RealtimeConfig =
            serde_json::from_str(r#"{"reconnect": {"enabled": false, "max_attempts": 3}}"#)
                .unwrap();
        assert!(!config.reconnect.enabled);
        assert_eq!(config.reconnect.max_attempts, Some(3));
        assert_eq!(config.reconnect.initial_delay_ms, 1000);
    }

    #[test]
    fn test_validate_rejects_zero_expiry() {
        let config = RealtimeConfig {
            typing_expiry_ms: 0,
            ..RealtimeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_delays() {
        let mut config = RealtimeConfig::default();
        config.reconnect.initial_delay_ms = 60_000;
        config.reconnect.max_delay_ms = 1_000;
        assert!(config.validate().is_err());
    }
}
