mod hcsr04;

pub use hcsr04::{Clock, DEFAULT_ECHO_TIMEOUT_US, HcSr04, SPEED_OF_SOUND_CM_PER_US};

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: timed out waiting for {phase}")]
    Timeout {
        sensor: &'static str,
        phase: &'static str,
    },
    #[error("{sensor}: failed to {operation}")]
    Pin {
        sensor: &'static str,
        operation: &'static str,
    },
}

/// A distance reading in centimetres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Distance(f32);

impl Distance {
    pub const fn from_cm(centimeters: f32) -> Self {
        Self(centimeters)
    }

    pub const fn as_cm(self) -> f32 {
        self.0
    }
}

/// Trait for sensors that report the distance to the nearest surface.
///
/// Measurements are blocking: echo timing must not yield to the executor
/// between the trigger and the falling edge.
pub trait DistanceSensor {
    fn measure(&mut self) -> Result<Distance, SensorError>;
}
