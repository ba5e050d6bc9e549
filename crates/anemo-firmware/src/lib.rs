//! ESP32-S3 firmware-specific modules for anemo-rs
//!
//! This crate holds the code that only makes sense on the device: peripheral
//! setup, the hall sensor edge interrupt, the hardware watchdog and the RTT
//! report output. Everything else lives in `anemo-core`.

#![no_std]

pub mod hall;
pub mod hardware;
pub mod rtt_sink;
