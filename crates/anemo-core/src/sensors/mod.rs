pub mod aht20;
pub mod bmp280;
pub mod registers;

use thiserror_no_std::Error;

pub use aht20::Aht20;
pub use bmp280::{Bmp280, Bmp280Calibration};
pub use registers::RegisterDevice;

/// Failures surfaced by the sensor drivers and the sampling orchestrator.
///
/// All variants are recoverable: the orchestrator retries them and, once the
/// retry budget is spent, reports sentinel values instead.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SensorError {
    #[error("{sensor}: I2C transaction failed during {operation}")]
    Bus {
        sensor: &'static str,
        operation: &'static str,
    },
    #[error("{sensor}: timed out waiting for {operation}")]
    Timeout {
        sensor: &'static str,
        operation: &'static str,
    },
    #[error(
        "implausible reading: {temperature_celsius} C, {humidity_percent} %RH, {pressure_hpa} hPa"
    )]
    Implausible {
        temperature_celsius: f32,
        humidity_percent: f32,
        pressure_hpa: f32,
    },
}

/// Compensated output of the BMP280.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureReadings {
    pub temperature_celsius: f32,
    pub pressure_hpa: f32,
}

/// Compensated output of the AHT20.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HumidityReadings {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
}

/// Trait for sensors that produce typed readings.
pub trait Sensor {
    /// The type of readings this sensor produces.
    type Readings;

    /// Name used in logs and error values.
    const NAME: &'static str;

    /// Read the sensor and return typed readings.
    fn read(&mut self) -> impl Future<Output = Result<Self::Readings, SensorError>>;
}
