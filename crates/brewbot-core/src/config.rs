use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sensors::DEFAULT_ECHO_TIMEOUT_US;
use crate::telemetry::RetryPolicy;
use crate::water::DEFAULT_WATER_LOW_THRESHOLD_CM;

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    pub internet: InternetConfig<'a>,
    #[serde(default)]
    pub telemetry: TelemetryConfig<'a>,
    #[serde(default)]
    pub panel: PanelConfig,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

/// Where telemetry callbacks are posted. An empty host disables delivery.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryConfig<'a> {
    pub host: &'a str,
    pub port: u16,
}

impl TelemetryConfig<'_> {
    pub const fn is_enabled(&self) -> bool {
        !self.host.is_empty() && self.port != 0
    }
}

/// Tunables for the control panel and its background workers
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct PanelConfig {
    /// Distances above this mean the reservoir is too low to brew
    pub water_low_threshold_cm: f32,
    /// How long the relay is held on for one brew
    pub brew_duration_secs: u32,
    /// Per-edge timeout of the ultrasonic echo
    pub echo_timeout_us: u32,
    /// Telemetry attempts per event
    pub retry_attempts: u8,
    /// Backoff step; attempt `n` waits `n` steps
    pub retry_backoff_ms: u32,
}

impl PanelConfig {
    pub const DEFAULT: Self = Self {
        water_low_threshold_cm: DEFAULT_WATER_LOW_THRESHOLD_CM,
        brew_duration_secs: 10,
        echo_timeout_us: DEFAULT_ECHO_TIMEOUT_US,
        retry_attempts: 3,
        retry_backoff_ms: 1000,
    };

    pub const fn brew_duration(&self) -> Duration {
        Duration::from_secs(self.brew_duration_secs as u64)
    }

    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            backoff_step: Duration::from_millis(self.retry_backoff_ms as u64),
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_section_is_optional() {
        let text = r#"{
            "internet": { "ssid": "kitchen", "password": "hunter2" },
            "telemetry": { "host": "192.168.1.20", "port": 5000 }
        }"#;

        let config: Config = serde_json::from_str(text).unwrap();

        assert_eq!(config.internet.ssid, "kitchen");
        assert_eq!(config.telemetry.port, 5000);
        assert!(config.telemetry.is_enabled());
        assert_eq!(config.panel, PanelConfig::DEFAULT);
    }

    #[test]
    fn test_partial_panel_section_keeps_other_defaults() {
        let text = r#"{
            "internet": { "ssid": "kitchen", "password": "" },
            "panel": { "brew_duration_secs": 45 }
        }"#;

        let config: Config = serde_json::from_str(text).unwrap();

        assert_eq!(config.panel.brew_duration(), Duration::from_secs(45));
        assert_eq!(config.panel.retry_attempts, 3);
        assert!(!config.telemetry.is_enabled());
    }

    #[test]
    fn test_retry_policy_from_panel_config() {
        let policy = PanelConfig::DEFAULT.retry_policy();

        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff_step, Duration::from_millis(1000));
    }
}
