//! Water-level check for the coffee maker reservoir
//!
//! The ultrasonic sensor looks down into the reservoir, so a larger distance
//! means less water.

use serde::Serialize;

use crate::sensors::Distance;

/// Distances above this are treated as a low reservoir
pub const DEFAULT_WATER_LOW_THRESHOLD_CM: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WaterLevel {
    Sufficient,
    Low,
    /// The sensor gave no reading
    Unknown,
}

impl WaterLevel {
    pub fn assess(reading: Option<Distance>, threshold_cm: f32) -> Self {
        match reading {
            Some(distance) if distance.as_cm() > threshold_cm => Self::Low,
            Some(_) => Self::Sufficient,
            None => Self::Unknown,
        }
    }

    /// An unknown level blocks brewing the same way a low one does.
    pub const fn allows_brewing(self) -> bool {
        matches!(self, Self::Sufficient)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Sufficient => "sufficient",
            Self::Low => "low",
            Self::Unknown => "unknown",
        }
    }
}

/// Result of a water check, as reported to the browser and to telemetry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaterReport {
    pub distance_cm: Option<f32>,
    pub threshold_cm: f32,
    pub level: WaterLevel,
}

impl WaterReport {
    pub fn new(reading: Option<Distance>, threshold_cm: f32) -> Self {
        Self {
            distance_cm: reading.map(Distance::as_cm),
            threshold_cm,
            level: WaterLevel::assess(reading, threshold_cm),
        }
    }

    pub const fn needs_alert(&self) -> bool {
        !self.level.allows_brewing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(cm: f32) -> Option<Distance> {
        Some(Distance::from_cm(cm))
    }

    #[test]
    fn test_level_around_threshold() {
        assert_eq!(WaterLevel::assess(at(4.2), 10.0), WaterLevel::Sufficient);
        assert_eq!(WaterLevel::assess(at(10.0), 10.0), WaterLevel::Sufficient);
        assert_eq!(WaterLevel::assess(at(10.01), 10.0), WaterLevel::Low);
        assert_eq!(WaterLevel::assess(None, 10.0), WaterLevel::Unknown);
    }

    #[test]
    fn test_only_sufficient_water_allows_brewing() {
        assert!(WaterLevel::Sufficient.allows_brewing());
        assert!(!WaterLevel::Low.allows_brewing());
        assert!(!WaterLevel::Unknown.allows_brewing());
    }

    #[test]
    fn test_report_json() {
        let low = WaterReport::new(at(12.5), 10.0);
        assert!(low.needs_alert());
        assert_eq!(
            serde_json::to_string(&low).unwrap(),
            r#"{"distance_cm":12.5,"threshold_cm":10.0,"level":"low"}"#
        );

        let missing = WaterReport::new(None, 10.0);
        assert_eq!(
            serde_json::to_string(&missing).unwrap(),
            r#"{"distance_cm":null,"threshold_cm":10.0,"level":"unknown"}"#
        );
    }
}
