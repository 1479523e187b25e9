//! HC-SR04 ultrasonic ranger
//!
//! The sensor is triggered with a 10 µs pulse and answers with an echo pulse
//! whose width is the round-trip time of the ultrasonic burst.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, error};

use super::{Distance, DistanceSensor, SensorError};

/// Speed of sound at room temperature
pub const SPEED_OF_SOUND_CM_PER_US: f32 = 0.0343;

/// Give up on an echo edge after this long (~5 m round trip)
pub const DEFAULT_ECHO_TIMEOUT_US: u32 = 30_000;

const SETTLE_US: u32 = 2;
const TRIGGER_PULSE_US: u32 = 10;
const SENSOR: &str = "HC-SR04";

/// Free-running microsecond counter used to time the echo pulse
pub trait Clock {
    fn now_micros(&self) -> u64;
}

pub struct HcSr04<T, E, D, C> {
    trigger: T,
    echo: E,
    delay: D,
    clock: C,
    timeout_us: u32,
}

impl<T, E, D, C> HcSr04<T, E, D, C>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
    C: Clock,
{
    pub fn new(trigger: T, echo: E, delay: D, clock: C) -> Self {
        Self {
            trigger,
            echo,
            delay,
            clock,
            timeout_us: DEFAULT_ECHO_TIMEOUT_US,
        }
    }

    pub fn with_timeout(mut self, timeout_us: u32) -> Self {
        self.timeout_us = timeout_us;
        self
    }

    fn fire_trigger(&mut self) -> Result<(), SensorError> {
        let pin_error = |e| {
            error!("HC-SR04 trigger write failed: {:?}", e);
            SensorError::Pin {
                sensor: SENSOR,
                operation: "drive trigger pin",
            }
        };

        self.trigger.set_low().map_err(pin_error)?;
        self.delay.delay_us(SETTLE_US);
        self.trigger.set_high().map_err(pin_error)?;
        self.delay.delay_us(TRIGGER_PULSE_US);
        self.trigger.set_low().map_err(pin_error)
    }

    /// Busy-wait while the echo line sits at `high`.
    ///
    /// Returns the last timestamp sampled before the line changed level.
    fn wait_while(&mut self, high: bool, phase: &'static str) -> Result<u64, SensorError> {
        let started = self.clock.now_micros();
        loop {
            let now = self.clock.now_micros();
            let level = self.echo.is_high().map_err(|e| {
                error!("HC-SR04 echo read failed: {:?}", e);
                SensorError::Pin {
                    sensor: SENSOR,
                    operation: "read echo pin",
                }
            })?;
            if level != high {
                return Ok(now);
            }
            if now.saturating_sub(started) > u64::from(self.timeout_us) {
                debug!("HC-SR04 gave up after {} us waiting for {}", self.timeout_us, phase);
                return Err(SensorError::Timeout {
                    sensor: SENSOR,
                    phase,
                });
            }
        }
    }
}

impl<T, E, D, C> DistanceSensor for HcSr04<T, E, D, C>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
    C: Clock,
{
    fn measure(&mut self) -> Result<Distance, SensorError> {
        self.fire_trigger()?;
        let rise = self.wait_while(false, "echo start")?;
        let fall = self.wait_while(true, "echo end")?;

        let pulse_us = fall.saturating_sub(rise);
        Ok(Distance::from_cm(
            pulse_us as f32 * SPEED_OF_SOUND_CM_PER_US / 2.0,
        ))
    }
}
