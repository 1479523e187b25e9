//! The control panel behind the web page
//!
//! [`ControlPanel`] owns the LED, the coffee-maker relay, the servo and the
//! distance sensor. Each HTTP request is turned into an [`Outcome`]: the reply
//! to send back and at most one piece of deferred work ([`FollowUp`]) for the
//! background workers. Nothing here touches the network, so the whole surface
//! is testable with pin doubles.

mod page;
mod routes;

pub use page::INDEX_HTML;
pub use routes::{Method, Route};

use alloc::format;
use alloc::string::{String, ToString};
use core::mem;

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::app_state::PanelError;
use crate::brew::{BrewError, BrewOrder, BrewState, CupCount, parse_order};
use crate::config::PanelConfig;
use crate::sensors::{Distance, DistanceSensor};
use crate::servo::{Servo, Sweep};
use crate::telemetry::TelemetryEvent;
use crate::water::WaterReport;

const TEXT: &str = "text/plain";
const JSON: &str = "application/json";
const HTML: &str = "text/html";

/// Rendered in place of a distance when the sensor gave no reading
pub const NO_READING: &str = "-1";

pub struct Request<'a> {
    pub method: Method,
    pub path: &'a str,
    pub body: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Static(&'static str),
    Owned(String),
}

impl Body {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Static(text) => *text,
            Self::Owned(text) => text.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Body,
}

impl Reply {
    fn text(status: u16, body: &'static str) -> Self {
        Self {
            status,
            content_type: TEXT,
            body: Body::Static(body),
        }
    }

    fn owned_text(body: String) -> Self {
        Self {
            status: 200,
            content_type: TEXT,
            body: Body::Owned(body),
        }
    }

    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self {
                status,
                content_type: JSON,
                body: Body::Owned(body),
            },
            Err(e) => {
                error!("Failed to encode reply: {}", e);
                Self::text(500, "Internal Server Error")
            }
        }
    }

    /// JSON error reply for a rejected brew
    pub fn brew_error(e: &BrewError) -> Self {
        #[derive(Serialize)]
        struct ErrorBody {
            error: String,
        }

        let status = match e {
            BrewError::InvalidRequest | BrewError::InvalidCups => 400,
            BrewError::AlreadyBrewing | BrewError::LowWater { .. } => 409,
            BrewError::WorkerUnavailable => 503,
            BrewError::Hardware(_) => 500,
        };
        Self::json(
            status,
            &ErrorBody {
                error: e.to_string(),
            },
        )
    }

    pub const fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            409 => "Conflict",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ => "",
        }
    }
}

/// Work deferred until after the reply has been sent
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FollowUp {
    Brew(BrewOrder),
    Telemetry(TelemetryEvent),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub reply: Reply,
    pub follow_up: Option<FollowUp>,
}

impl From<Reply> for Outcome {
    fn from(reply: Reply) -> Self {
        Self {
            reply,
            follow_up: None,
        }
    }
}

/// Cumulative usage since boot
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageCounters {
    pub led_toggles: u32,
    pub servo_moves: u32,
    pub distance_readings: u32,
    pub water_alerts: u32,
    pub brews: u32,
    pub cups_brewed: u32,
}

#[derive(Serialize)]
struct StatsReport {
    led_on: bool,
    servo_angle: u16,
    brewing_cups: Option<u8>,
    counters: UsageCounters,
}

#[derive(Serialize)]
struct BrewStarted {
    status: &'static str,
    cups: u8,
    duration_secs: u64,
}

/// What the HTTP handler and the brew worker need from a panel
pub trait PanelControl {
    fn handle(&mut self, request: &Request<'_>) -> Outcome;

    /// Switch the coffee maker off after a brew. Returns the stats event to post.
    fn finish_brew(&mut self) -> Result<Option<TelemetryEvent>, PanelError>;

    /// Undo a brew whose order never reached the worker.
    fn cancel_brew(&mut self);
}

pub struct ControlPanel<L, R, P, S> {
    led: L,
    relay: R,
    servo: Servo<P>,
    sweep: Sweep,
    sonar: S,
    config: PanelConfig,
    led_on: bool,
    brew: BrewState,
    counters: UsageCounters,
}

impl<L, R, P, S> ControlPanel<L, R, P, S>
where
    L: OutputPin,
    R: OutputPin,
    P: SetDutyCycle,
    S: DistanceSensor,
{
    /// Take ownership of the peripherals with the LED and relay off.
    pub fn new(
        led: L,
        relay: R,
        servo: Servo<P>,
        sonar: S,
        config: PanelConfig,
    ) -> Result<Self, PanelError> {
        let mut panel = Self {
            led,
            relay,
            servo,
            sweep: Sweep::new(),
            sonar,
            config,
            led_on: false,
            brew: BrewState::Idle,
            counters: UsageCounters::default(),
        };
        panel.set_relay(false)?;
        panel.set_led(false)?;
        Ok(panel)
    }

    fn set_led(&mut self, on: bool) -> Result<(), PanelError> {
        self.led.set_state(on.into()).map_err(|e| {
            error!("LED write failed: {:?}", e);
            PanelError::Gpio { device: "led" }
        })?;
        self.led_on = on;
        Ok(())
    }

    fn set_relay(&mut self, on: bool) -> Result<(), PanelError> {
        self.relay.set_state(on.into()).map_err(|e| {
            error!("Relay write failed: {:?}", e);
            PanelError::Gpio { device: "relay" }
        })
    }

    pub fn toggle_led(&mut self) -> Result<bool, PanelError> {
        let on = !self.led_on;
        self.set_led(on)?;
        self.counters.led_toggles += 1;
        info!("LED {}", if on { "on" } else { "off" });
        Ok(on)
    }

    pub fn move_servo(&mut self) -> Result<u16, PanelError> {
        let max = self.servo.calibration().max_degrees;
        let target = self.sweep.next_angle(max);
        self.servo.set_angle(target)?;
        self.counters.servo_moves += 1;
        info!("Servo moved to {}°", target);
        Ok(target)
    }

    /// One distance measurement; `None` when the sensor did not answer.
    pub fn read_distance(&mut self) -> Option<Distance> {
        match self.sonar.measure() {
            Ok(distance) => {
                self.counters.distance_readings += 1;
                debug!("Distance {:.2} cm", distance.as_cm());
                Some(distance)
            }
            Err(e) => {
                warn!("No distance reading: {}", e);
                None
            }
        }
    }

    pub fn check_water(&mut self) -> WaterReport {
        let reading = self.read_distance();
        WaterReport::new(reading, self.config.water_low_threshold_cm)
    }

    /// Switch the coffee maker on if the panel is idle and there is water.
    ///
    /// The returned order must reach the brew worker; otherwise call
    /// [`PanelControl::cancel_brew`].
    pub fn start_brew(&mut self, cups: CupCount) -> Result<BrewOrder, BrewError> {
        if self.is_brewing() {
            return Err(BrewError::AlreadyBrewing);
        }

        let report = self.check_water();
        if !report.level.allows_brewing() {
            warn!("Refusing to brew, water level {}", report.level.label());
            return Err(BrewError::LowWater {
                distance_cm: report.distance_cm,
            });
        }

        self.set_relay(true)?;
        if let Err(e) = self.set_led(true) {
            // best effort, the relay must not stay on without a worker
            let _ = self.set_relay(false);
            return Err(e.into());
        }

        self.brew = BrewState::Brewing { cups };
        info!("Brewing {} cups", cups.count());
        Ok(BrewOrder {
            cups,
            duration: self.config.brew_duration(),
        })
    }

    /// Raise a water alert, returning the event to post.
    fn water_alert(&mut self, distance_cm: Option<f32>) -> TelemetryEvent {
        self.counters.water_alerts += 1;
        TelemetryEvent::WaterAlert {
            distance_cm,
            threshold_cm: self.config.water_low_threshold_cm,
        }
    }

    pub fn counters(&self) -> &UsageCounters {
        &self.counters
    }

    pub fn is_brewing(&self) -> bool {
        matches!(self.brew, BrewState::Brewing { .. })
    }

    pub fn led_on(&self) -> bool {
        self.led_on
    }

    pub fn servo_angle(&self) -> u16 {
        self.servo.angle()
    }

    fn make_coffee(&mut self, body: &[u8]) -> Outcome {
        let order = parse_order(body).and_then(|cups| self.start_brew(cups));
        match order {
            Ok(order) => Outcome {
                reply: Reply::json(
                    200,
                    &BrewStarted {
                        status: "brewing",
                        cups: order.cups.count(),
                        duration_secs: order.duration.as_secs(),
                    },
                ),
                follow_up: Some(FollowUp::Brew(order)),
            },
            Err(e) => {
                let follow_up = match e {
                    BrewError::LowWater { distance_cm } => {
                        Some(FollowUp::Telemetry(self.water_alert(distance_cm)))
                    }
                    _ => None,
                };
                Outcome {
                    reply: Reply::brew_error(&e),
                    follow_up,
                }
            }
        }
    }

    fn stats(&self) -> Reply {
        let brewing_cups = match self.brew {
            BrewState::Brewing { cups } => Some(cups.count()),
            BrewState::Idle => None,
        };
        Reply::json(
            200,
            &StatsReport {
                led_on: self.led_on,
                servo_angle: self.servo.angle(),
                brewing_cups,
                counters: self.counters,
            },
        )
    }
}

impl<L, R, P, S> PanelControl for ControlPanel<L, R, P, S>
where
    L: OutputPin,
    R: OutputPin,
    P: SetDutyCycle,
    S: DistanceSensor,
{
    fn handle(&mut self, request: &Request<'_>) -> Outcome {
        let Some(route) = Route::from_path(request.path) else {
            debug!("No route for {}", request.path);
            return Reply::text(404, "Not Found").into();
        };
        if route.method() != request.method {
            return Reply::text(405, "Method Not Allowed").into();
        }

        match route {
            Route::Index => Reply {
                status: 200,
                content_type: HTML,
                body: Body::Static(INDEX_HTML),
            }
            .into(),
            Route::ToggleLed => match self.toggle_led() {
                Ok(on) => Reply::text(200, if on { "1" } else { "0" }).into(),
                Err(_) => Reply::text(500, "LED write failed").into(),
            },
            Route::MoveServo => match self.move_servo() {
                Ok(angle) => Reply::owned_text(format!("{}", angle)).into(),
                Err(_) => Reply::text(500, "Servo update failed").into(),
            },
            Route::GetDistance => match self.read_distance() {
                Some(distance) => Reply::owned_text(format!("{:.2}", distance.as_cm())).into(),
                None => Reply::text(200, NO_READING).into(),
            },
            Route::CheckWater => {
                let report = self.check_water();
                let follow_up = report
                    .needs_alert()
                    .then(|| FollowUp::Telemetry(self.water_alert(report.distance_cm)));
                Outcome {
                    reply: Reply::json(200, &report),
                    follow_up,
                }
            }
            Route::MakeCoffee => self.make_coffee(request.body),
            Route::Stats => self.stats().into(),
        }
    }

    fn finish_brew(&mut self) -> Result<Option<TelemetryEvent>, PanelError> {
        let relay = self.set_relay(false);
        let led = self.set_led(false);

        let brew = mem::take(&mut self.brew);
        relay?;
        led?;

        // only a brew that ended with the outputs off is counted and posted
        let BrewState::Brewing { cups } = brew else {
            return Ok(None);
        };

        self.counters.brews += 1;
        self.counters.cups_brewed += u32::from(cups.count());
        info!(
            "Brew of {} cups done ({} brews, {} cups since boot)",
            cups.count(),
            self.counters.brews,
            self.counters.cups_brewed
        );

        Ok(Some(TelemetryEvent::StatsUpdate {
            cups: cups.count(),
            total_brews: self.counters.brews,
            total_cups: self.counters.cups_brewed,
        }))
    }

    fn cancel_brew(&mut self) {
        warn!("Cancelling brew");
        // best effort, errors are already logged by the setters
        let _ = self.set_relay(false);
        let _ = self.set_led(false);
        self.brew = BrewState::Idle;
    }
}
