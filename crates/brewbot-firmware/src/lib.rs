//! ESP32-S3 firmware-specific modules for brewbot
//!
//! This crate contains the code that only builds for the device: esp-hal
//! peripheral bring-up, esp-radio Wi-Fi, the embassy-net stack, the TCP
//! telemetry transport and the compile-time secrets.

#![no_std]

extern crate alloc;

pub mod hardware;
pub mod network;
pub mod secrets;
pub mod telemetry;
