//! Telemetry callbacks posted to the companion server
//!
//! Events are queued by the panel and delivered by a background worker over
//! whatever [`TelemetryTransport`] the platform provides.

mod request;
mod retry;

pub use request::{MAX_REQUEST_LEN, format_post, parse_status_code};
pub use retry::{RetryPolicy, TelemetryTransport, deliver};

use alloc::string::String;
use serde::Serialize;
use thiserror_no_std::Error;

use crate::sensors::Distance;
use crate::water::WaterReport;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("could not connect to telemetry server")]
    Connect,
    #[error("could not resolve telemetry host")]
    Dns,
    #[error("socket {operation} failed")]
    Io { operation: &'static str },
    #[error("server answered {0}")]
    Status(u16),
    #[error("malformed HTTP status line")]
    MalformedResponse,
    #[error("request does not fit the send buffer")]
    RequestTooLarge,
    #[error("failed to encode {event} payload")]
    Encode { event: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryEvent {
    WaterAlert {
        distance_cm: Option<f32>,
        threshold_cm: f32,
    },
    StatsUpdate {
        cups: u8,
        total_brews: u32,
        total_cups: u32,
    },
}

#[derive(Serialize)]
struct StatsPayload {
    cups: u8,
    total_brews: u32,
    total_cups: u32,
}

impl TelemetryEvent {
    pub const fn path(&self) -> &'static str {
        match self {
            Self::WaterAlert { .. } => "/water_alert",
            Self::StatsUpdate { .. } => "/update_stats",
        }
    }

    pub fn to_json(&self) -> Result<String, TelemetryError> {
        let encoded = match *self {
            Self::WaterAlert {
                distance_cm,
                threshold_cm,
            } => serde_json::to_string(&WaterReport::new(
                distance_cm.map(Distance::from_cm),
                threshold_cm,
            )),
            Self::StatsUpdate {
                cups,
                total_brews,
                total_cups,
            } => serde_json::to_string(&StatsPayload {
                cups,
                total_brews,
                total_cups,
            }),
        };

        encoded.map_err(|_| TelemetryError::Encode { event: self.path() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_paths() {
        let alert = TelemetryEvent::WaterAlert {
            distance_cm: None,
            threshold_cm: 10.0,
        };
        let stats = TelemetryEvent::StatsUpdate {
            cups: 2,
            total_brews: 1,
            total_cups: 2,
        };

        assert_eq!(alert.path(), "/water_alert");
        assert_eq!(stats.path(), "/update_stats");
    }

    #[test]
    fn test_water_alert_payload() {
        let alert = TelemetryEvent::WaterAlert {
            distance_cm: Some(12.5),
            threshold_cm: 10.0,
        };

        assert_eq!(
            alert.to_json().unwrap(),
            r#"{"distance_cm":12.5,"threshold_cm":10.0,"level":"low"}"#
        );
    }

    #[test]
    fn test_stats_payload() {
        let stats = TelemetryEvent::StatsUpdate {
            cups: 4,
            total_brews: 3,
            total_cups: 10,
        };

        assert_eq!(
            stats.to_json().unwrap(),
            r#"{"cups":4,"total_brews":3,"total_cups":10}"#
        );
    }
}
