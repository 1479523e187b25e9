//! Simulated panel peripherals that log instead of driving pins

use std::convert::Infallible;
use std::time::Instant;

use brewbot_core::sensors::{Distance, DistanceSensor, SensorError};
use embedded_hal::digital::{ErrorType as DigitalErrorType, OutputPin};
use embedded_hal::pwm::{ErrorType as PwmErrorType, SetDutyCycle};
use log::info;

/// Output pin that logs level changes
pub struct SimPin {
    name: &'static str,
    high: Option<bool>,
}

impl SimPin {
    pub fn new(name: &'static str) -> Self {
        Self { name, high: None }
    }

    fn set(&mut self, high: bool) {
        if self.high != Some(high) {
            info!("[{}] {}", self.name, if high { "HIGH" } else { "LOW" });
        }
        self.high = Some(high);
    }
}

impl DigitalErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}

/// 13-bit PWM channel, like the LEDC timer on the board
pub struct SimPwm;

impl PwmErrorType for SimPwm {
    type Error = Infallible;
}

impl SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        (1 << 13) - 1
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        info!("[servo] duty {}/{}", duty, self.max_duty_cycle());
        Ok(())
    }
}

/// Water surface that slowly rises and falls, with the odd missed echo.
pub struct SimSonar {
    started: Instant,
    readings: u32,
}

impl SimSonar {
    /// Every n-th measurement times out
    const DROPOUT_EVERY: u32 = 7;

    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            readings: 0,
        }
    }
}

impl Default for SimSonar {
    fn default() -> Self {
        Self::new()
    }
}

impl DistanceSensor for SimSonar {
    fn measure(&mut self) -> Result<Distance, SensorError> {
        self.readings += 1;
        if self.readings % Self::DROPOUT_EVERY == 0 {
            return Err(SensorError::Timeout {
                sensor: "sim-sonar",
                phase: "echo start",
            });
        }

        // 5–13 cm below the sensor over a two-minute cycle
        let t = self.started.elapsed().as_secs_f32();
        let cm = 9.0 + 4.0 * (t / 120.0 * core::f32::consts::TAU).sin();
        Ok(Distance::from_cm(cm))
    }
}
