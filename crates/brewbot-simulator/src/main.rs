//! Desktop simulator for the brewbot control panel.
//!
//! Serves the same page and endpoints as the firmware, backed by logging pins
//! and a synthetic water level, so the panel can be exercised from a browser
//! without hardware.
//!
//! ```text
//! brewbot-simulator [config.json]
//! ```
//!
//! The optional JSON file has the same shape as the firmware configuration.
//! `BREWBOT_LISTEN` overrides the listen address (default `127.0.0.1:8080`),
//! and `RUST_LOG` the log level.

mod devices;
mod transport;

use std::error::Error;
use std::net::SocketAddr;
use std::{env, fs, thread};

use brewbot_core::app_state::SharedPanel;
use brewbot_core::config::{Config, PanelConfig};
use brewbot_core::panel::ControlPanel;
use brewbot_core::server::PanelHandler;
use brewbot_core::servo::{Servo, ServoCalibration};
use brewbot_core::workers;
use edge_http::io::server::Server;
use edge_nal::TcpBind;
use log::{error, info};
// Links embassy-time's std time driver, which edge-http's timeouts require on the host.
use embassy_time as _;

use devices::{SimPin, SimPwm, SimSonar};
use transport::{SmolDelay, SmolTransport};

const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

type SimPanel = ControlPanel<SimPin, SimPin, SimPwm, SimSonar>;

/// Load the configuration named on the command line, or fall back to defaults.
fn load_config() -> Result<Config<'static>, Box<dyn Error>> {
    let Some(path) = env::args().nth(1) else {
        info!("No config file given, using defaults (telemetry disabled)");
        return Ok(Config::default());
    };

    // The config borrows its strings; it lives as long as the process
    let text: &'static str = Box::leak(fs::read_to_string(&path)?.into_boxed_str());
    let config = serde_json::from_str(text)?;
    info!("Loaded config from {}", path);
    Ok(config)
}

fn build_panel(config: PanelConfig) -> Result<&'static SharedPanel<SimPanel>, Box<dyn Error>> {
    let servo = Servo::new(SimPwm, ServoCalibration::SG90).map_err(|e| e.to_string())?;
    let panel = ControlPanel::new(
        SimPin::new("led"),
        SimPin::new("relay"),
        servo,
        SimSonar::new(),
        config,
    )
    .map_err(|e| e.to_string())?;
    Ok(Box::leak(Box::new(SharedPanel::new(panel))))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    info!("Starting brewbot simulator");

    let config = load_config()?;
    let panel = build_panel(config.panel)?;

    let transport = SmolTransport::new(&config.telemetry);
    let policy = config.panel.retry_policy();
    thread::Builder::new()
        .name("telemetry".into())
        .spawn(move || smol::block_on(workers::run_telemetry_worker(transport, SmolDelay, policy)))?;
    thread::Builder::new()
        .name("brew".into())
        .spawn(move || smol::block_on(workers::run_brew_worker(panel, SmolDelay)))?;

    let listen: SocketAddr = env::var("BREWBOT_LISTEN")
        .unwrap_or_else(|_| DEFAULT_LISTEN.to_owned())
        .parse()?;

    smol::block_on(async {
        let stack = edge_nal_std::Stack::new();
        let acceptor = stack.bind(listen).await?;
        info!("Control panel at http://{}/", listen);

        let handler = PanelHandler::new(panel);
        let mut server = Server::<4, 2048, 32>::new();
        if let Err(e) = server.run(None, acceptor, handler).await {
            error!("HTTP server stopped: {:?}", e);
            return Err(format!("HTTP server stopped: {e:?}").into());
        }
        Ok::<(), Box<dyn Error>>(())
    })
}
