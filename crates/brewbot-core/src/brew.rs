//! Brew orders and their validation

use core::time::Duration;

use serde_json::Value;
use thiserror_no_std::Error;

use crate::app_state::PanelError;

/// Cup sizes the coffee maker supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CupCount {
    Two,
    Four,
    Eight,
}

impl CupCount {
    pub const fn count(self) -> u8 {
        match self {
            Self::Two => 2,
            Self::Four => 4,
            Self::Eight => 8,
        }
    }

    pub const fn from_count(cups: u64) -> Option<Self> {
        match cups {
            2 => Some(Self::Two),
            4 => Some(Self::Four),
            8 => Some(Self::Eight),
            _ => None,
        }
    }
}

/// Work handed to the brew worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrewOrder {
    pub cups: CupCount,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrewState {
    #[default]
    Idle,
    Brewing {
        cups: CupCount,
    },
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum BrewError {
    #[error("request body is not a JSON object with a cups field")]
    InvalidRequest,
    #[error("cups must be 2, 4 or 8")]
    InvalidCups,
    #[error("a brew is already in progress")]
    AlreadyBrewing,
    #[error("water level too low to brew")]
    LowWater { distance_cm: Option<f32> },
    #[error("brew worker is not accepting orders")]
    WorkerUnavailable,
    #[error("hardware fault: {0}")]
    Hardware(PanelError),
}

impl From<PanelError> for BrewError {
    fn from(e: PanelError) -> Self {
        Self::Hardware(e)
    }
}

/// Parse a `/make_coffee` body: `{"cups":"4"}` or `{"cups":4}`.
pub fn parse_order(body: &[u8]) -> Result<CupCount, BrewError> {
    let request: Value = serde_json::from_slice(body).map_err(|_| BrewError::InvalidRequest)?;
    let cups = request.get("cups").ok_or(BrewError::InvalidRequest)?;

    let count = match cups {
        Value::String(text) => text.trim().parse::<u64>().ok(),
        Value::Number(number) => number.as_u64(),
        _ => None,
    };

    count
        .and_then(CupCount::from_count)
        .ok_or(BrewError::InvalidCups)
}
