//! Hardware-independent core library for anemo-rs
//!
//! This crate contains all platform-agnostic logic for the wind and
//! environment station: the BMP280 and AHT20 protocol drivers with their
//! fixed-point compensation, the interrupt-safe anemometer pulse counter,
//! wind-speed estimation and smoothing, the retrying sampling orchestrator and
//! the fixed-interval reporting scheduler.
//!
//! It is `#![no_std]` so it compiles on both embedded targets (ESP32-S3) and
//! desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

pub mod async_i2c_bus;
pub mod config;
pub mod pulse_counter;
pub mod report;
pub mod sampling;
pub mod scheduler;
pub mod sensors;
pub mod wind;

#[cfg(test)]
mod testing;
