//! Hardware-independent core library for brewbot
//!
//! This crate contains all platform-agnostic logic for the brewbot control
//! panel: servo duty mapping, HC-SR04 echo timing, the water-level gate,
//! brew bookkeeping, telemetry payloads and delivery, HTTP routing, and the
//! edge-http request handler shared by the firmware and the simulator.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod app_state;
pub mod brew;
pub mod config;
pub mod panel;
pub mod sensors;
pub mod server;
pub mod servo;
pub mod telemetry;
pub mod water;
pub mod workers;
