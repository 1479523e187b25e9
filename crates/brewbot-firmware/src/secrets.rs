//! Configuration baked in at build time from `.env` (see `build.rs`)

use brewbot_core::config::{Config, InternetConfig, PanelConfig, TelemetryConfig};

pub const CONFIG: Config<'static> = Config {
    internet: InternetConfig {
        ssid: env!("WIFI_SSID"),
        password: env!("WIFI_PASSWORD"),
    },
    telemetry: TelemetryConfig {
        host: env!("TELEMETRY_HOST"),
        port: parse_port(env!("TELEMETRY_PORT")),
    },
    panel: PanelConfig::DEFAULT,
};

/// Decimal port number; empty means telemetry is off. Anything else fails the build.
const fn parse_port(text: &str) -> u16 {
    let digits = text.as_bytes();
    let mut port: u32 = 0;
    let mut i = 0;
    while i < digits.len() {
        let digit = digits[i];
        assert!(digit.is_ascii_digit(), "TELEMETRY_PORT must be a number");
        port = port * 10 + (digit - b'0') as u32;
        assert!(port <= u16::MAX as u32, "TELEMETRY_PORT is out of range");
        i += 1;
    }
    port as u16
}
