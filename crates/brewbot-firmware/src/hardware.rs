//! Peripheral bring-up for the brewbot board
//!
//! Pin map:
//! - GPIO12: status LED
//! - GPIO13: servo signal (LEDC channel 0, 50 Hz, 13-bit)
//! - GPIO5 / GPIO18: HC-SR04 trigger / echo
//! - GPIO4: coffee-maker relay

use brewbot_core::app_state::PanelError;
use brewbot_core::config::PanelConfig;
use brewbot_core::panel::ControlPanel;
use brewbot_core::sensors::{Clock, HcSr04};
use brewbot_core::servo::{Servo, ServoCalibration};
use esp_hal::delay::Delay;
use esp_hal::gpio::{DriveMode, Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::ledc::channel::{self, ChannelIFace};
use esp_hal::ledc::timer::{self, TimerIFace};
use esp_hal::ledc::{LSGlobalClkSource, Ledc, LowSpeed};
use esp_hal::peripherals::{GPIO4, GPIO5, GPIO12, GPIO13, GPIO18, LEDC};
use esp_hal::time::Rate;
use log::{error, info};
use static_cell::StaticCell;

/// Microseconds since boot from the embassy time driver
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_micros(&self) -> u64 {
        embassy_time::Instant::now().as_micros()
    }
}

pub type ServoChannel = channel::Channel<'static, LowSpeed>;
pub type BoardSonar = HcSr04<Output<'static>, Input<'static>, Delay, EmbassyClock>;
pub type BoardPanel = ControlPanel<Output<'static>, Output<'static>, ServoChannel, BoardSonar>;

/// Peripherals the control panel takes over
pub struct PanelPeripherals {
    pub ledc: LEDC<'static>,
    pub led: GPIO12<'static>,
    pub servo: GPIO13<'static>,
    pub trigger: GPIO5<'static>,
    pub echo: GPIO18<'static>,
    pub relay: GPIO4<'static>,
}

/// Configure the LEDC timer and channel driving the servo
fn init_servo_channel(
    ledc: LEDC<'static>,
    pin: GPIO13<'static>,
    calibration: &ServoCalibration,
) -> Result<ServoChannel, PanelError> {
    static SERVO_TIMER: StaticCell<timer::Timer<'static, LowSpeed>> = StaticCell::new();

    let mut ledc = Ledc::new(ledc);
    ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);

    let servo_timer = SERVO_TIMER.init(ledc.timer::<LowSpeed>(timer::Number::Timer0));
    servo_timer
        .configure(timer::config::Config {
            duty: timer::config::Duty::Duty13Bit,
            clock_source: timer::LSClockSource::APBClk,
            frequency: Rate::from_hz(calibration.frequency_hz()),
        })
        .map_err(|e| {
            error!("LEDC timer configuration failed: {:?}", e);
            PanelError::Pwm {
                device: "servo timer",
            }
        })?;

    let mut servo_channel = ledc.channel(channel::Number::Channel0, pin);
    servo_channel
        .configure(channel::config::Config {
            timer: servo_timer,
            duty_pct: 0,
            drive_mode: DriveMode::PushPull,
        })
        .map_err(|e| {
            error!("LEDC channel configuration failed: {:?}", e);
            PanelError::Pwm { device: "servo" }
        })?;

    Ok(servo_channel)
}

/// Bring up every panel peripheral with the outputs off and the servo at 0°.
pub fn init_panel(
    peripherals: PanelPeripherals,
    config: PanelConfig,
) -> Result<BoardPanel, PanelError> {
    let led = Output::new(peripherals.led, Level::Low, OutputConfig::default());
    let relay = Output::new(peripherals.relay, Level::Low, OutputConfig::default());

    let calibration = ServoCalibration::SG90;
    let servo_channel = init_servo_channel(peripherals.ledc, peripherals.servo, &calibration)?;
    let servo = Servo::new(servo_channel, calibration)?;
    info!("Servo ready on GPIO13");

    let trigger = Output::new(peripherals.trigger, Level::Low, OutputConfig::default());
    let echo = Input::new(
        peripherals.echo,
        InputConfig::default().with_pull(Pull::Down),
    );
    let sonar = HcSr04::new(trigger, echo, Delay::new(), EmbassyClock)
        .with_timeout(config.echo_timeout_us);
    info!("HC-SR04 ready on GPIO5/GPIO18");

    ControlPanel::new(led, relay, servo, sonar, config)
}
