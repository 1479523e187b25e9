//! Hobby servo control over any embedded-hal PWM channel

use embedded_hal::pwm::SetDutyCycle;
use log::{debug, error};

use crate::app_state::PanelError;

/// Pulse-width calibration of a positional servo.
///
/// The pulse width is linear in the commanded angle, and the duty cycle is the
/// pulse width as a fraction of the PWM period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoCalibration {
    /// Pulse width at 0°
    pub min_pulse_us: u32,
    /// Pulse width at `max_degrees`
    pub max_pulse_us: u32,
    pub max_degrees: u16,
    /// PWM period (20 ms = 50 Hz for hobby servos)
    pub period_us: u32,
}

impl ServoCalibration {
    /// SG90 and most 180° hobby servos
    pub const SG90: Self = Self {
        min_pulse_us: 500,
        max_pulse_us: 2500,
        max_degrees: 180,
        period_us: 20_000,
    };

    pub const fn frequency_hz(&self) -> u32 {
        1_000_000 / self.period_us
    }

    /// Pulse width for an angle, clamped to `max_degrees`
    pub fn pulse_width_us(&self, degrees: u16) -> u32 {
        let degrees = u32::from(degrees.min(self.max_degrees));
        self.min_pulse_us
            + (self.max_pulse_us - self.min_pulse_us) * degrees / u32::from(self.max_degrees)
    }

    /// Duty value for an angle given the channel's full-scale duty
    pub fn duty_for(&self, degrees: u16, max_duty: u16) -> u16 {
        let duty = self.pulse_width_us(degrees) * u32::from(max_duty) / self.period_us;
        // pulse <= period, so this never exceeds max_duty
        duty as u16
    }
}

impl Default for ServoCalibration {
    fn default() -> Self {
        Self::SG90
    }
}

pub struct Servo<P> {
    pwm: P,
    calibration: ServoCalibration,
    angle: u16,
}

impl<P: SetDutyCycle> Servo<P> {
    /// Wrap a configured PWM channel and park the horn at 0°.
    pub fn new(pwm: P, calibration: ServoCalibration) -> Result<Self, PanelError> {
        let mut servo = Self {
            pwm,
            calibration,
            angle: 0,
        };
        servo.set_angle(0)?;
        Ok(servo)
    }

    pub fn set_angle(&mut self, degrees: u16) -> Result<(), PanelError> {
        let degrees = degrees.min(self.calibration.max_degrees);
        let duty = self
            .calibration
            .duty_for(degrees, self.pwm.max_duty_cycle());

        self.pwm.set_duty_cycle(duty).map_err(|e| {
            error!("Servo duty update failed: {:?}", e);
            PanelError::Pwm { device: "servo" }
        })?;

        debug!("Servo at {}° (duty {})", degrees, duty);
        self.angle = degrees;
        Ok(())
    }

    pub fn angle(&self) -> u16 {
        self.angle
    }

    pub fn calibration(&self) -> &ServoCalibration {
        &self.calibration
    }
}

/// End-to-end sweep: every step jumps to the opposite end of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sweep {
    toward_max: bool,
}

impl Sweep {
    pub const fn new() -> Self {
        Self { toward_max: true }
    }

    /// Next target angle; flips direction for the following call.
    pub fn next_angle(&mut self, max_degrees: u16) -> u16 {
        let target = if self.toward_max { max_degrees } else { 0 };
        self.toward_max = !self.toward_max;
        target
    }
}

impl Default for Sweep {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    /// 13-bit LEDC channel
    struct FakePwm {
        duty: u16,
    }

    impl embedded_hal::pwm::ErrorType for FakePwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for FakePwm {
        fn max_duty_cycle(&self) -> u16 {
            (1 << 13) - 1
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
            self.duty = duty;
            Ok(())
        }
    }

    #[test]
    fn test_pulse_width_is_linear() {
        let sg90 = ServoCalibration::SG90;

        assert_eq!(sg90.pulse_width_us(0), 500);
        assert_eq!(sg90.pulse_width_us(90), 1500);
        assert_eq!(sg90.pulse_width_us(180), 2500);
    }

    #[test]
    fn test_duty_matches_13_bit_ledc() {
        let sg90 = ServoCalibration::SG90;

        assert_eq!(sg90.duty_for(0, 8191), 204);
        assert_eq!(sg90.duty_for(90, 8191), 614);
        assert_eq!(sg90.duty_for(180, 8191), 1023);
        assert_eq!(sg90.frequency_hz(), 50);
    }

    #[test]
    fn test_angles_past_travel_are_clamped() {
        let sg90 = ServoCalibration::SG90;

        assert_eq!(sg90.pulse_width_us(270), 2500);
        assert_eq!(sg90.duty_for(270, 8191), sg90.duty_for(180, 8191));
    }

    #[test]
    fn test_servo_parks_at_zero_and_tracks_angle() {
        let mut servo = Servo::new(FakePwm { duty: 0xFFFF }, ServoCalibration::SG90).unwrap();
        assert_eq!(servo.pwm.duty, 204);
        assert_eq!(servo.angle(), 0);

        servo.set_angle(180).unwrap();
        assert_eq!(servo.pwm.duty, 1023);
        assert_eq!(servo.angle(), 180);
    }

    #[test]
    fn test_sweep_alternates_between_ends() {
        let mut sweep = Sweep::new();

        assert_eq!(sweep.next_angle(180), 180);
        assert_eq!(sweep.next_angle(180), 0);
        assert_eq!(sweep.next_angle(180), 180);
        assert_eq!(sweep.next_angle(180), 0);
    }
}
