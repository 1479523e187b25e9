//! Application-wide channels, shared state and error types for brewbot

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex as AsyncMutex;
use log::warn;
use thiserror_no_std::Error;

use crate::brew::BrewOrder;
use crate::telemetry::TelemetryEvent;

/// Pending telemetry callbacks; overflow is dropped rather than blocking a request
pub const TELEMETRY_QUEUE_DEPTH: usize = 4;

/// Brew orders handed from the HTTP handler to the brew worker.
///
/// Capacity 1 is enough: the panel refuses a second order while one is brewing,
/// and the worker takes the order off the channel as soon as it starts.
pub static BREW_ORDERS: Channel<CriticalSectionRawMutex, BrewOrder, 1> = Channel::new();

/// Events waiting to be posted to the telemetry server
pub static TELEMETRY_EVENTS: Channel<CriticalSectionRawMutex, TelemetryEvent, TELEMETRY_QUEUE_DEPTH> =
    Channel::new();

/// The control panel as shared between the HTTP handler and the brew worker
pub type SharedPanel<P> = AsyncMutex<CriticalSectionRawMutex, P>;

/// Queue a telemetry event without waiting. Returns `false` if it was dropped.
pub fn queue_telemetry(event: TelemetryEvent) -> bool {
    match TELEMETRY_EVENTS.try_send(event) {
        Ok(()) => true,
        Err(_) => {
            warn!("Telemetry queue full, dropping {} event", event.path());
            false
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelError {
    #[error("GPIO write to {device} failed")]
    Gpio { device: &'static str },
    #[error("PWM update of {device} failed")]
    Pwm { device: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_telemetry_drops_when_full() {
        while TELEMETRY_EVENTS.try_receive().is_ok() {}

        let event = TelemetryEvent::StatsUpdate {
            cups: 2,
            total_brews: 1,
            total_cups: 2,
        };
        for _ in 0..TELEMETRY_QUEUE_DEPTH {
            assert!(queue_telemetry(event));
        }
        assert!(!queue_telemetry(event));

        while TELEMETRY_EVENTS.try_receive().is_ok() {}
    }
}
