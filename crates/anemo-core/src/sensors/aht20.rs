//! AHT20 humidity and temperature driver

use super::{HumidityReadings, RegisterDevice, Sensor, SensorError};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{error, info, warn};

pub const DEFAULT_ADDRESS: u8 = 0x38;

const SENSOR_NAME: &str = "AHT20";

const INIT_COMMAND: [u8; 3] = [0xE1, 0x08, 0x00];
const TRIGGER_COMMAND: [u8; 3] = [0xAC, 0x33, 0x00];

const STATUS_BUSY: u8 = 0x80;

const INIT_SETTLE_MS: u32 = 40;
const MEASUREMENT_MS: u32 = 80;
const BUSY_POLL_INTERVAL_MS: u32 = 10;
/// Busy polls after the conversion wait before giving up.
pub const MAX_BUSY_POLLS: u32 = 20;

/// Full-scale value of the 20-bit humidity and temperature fields.
const FULL_SCALE: f32 = 1_048_576.0;

pub struct Aht20<I, D> {
    dev: RegisterDevice<I>,
    delay: D,
    initialized: bool,
}

impl<I: I2c, D: DelayNs> Aht20<I, D> {
    pub const fn new(i2c: I, delay: D, address: u8) -> Self {
        Self {
            dev: RegisterDevice::new(i2c, address),
            delay,
            initialized: false,
        }
    }

    /// Send the initialization command and wait for the sensor to settle.
    pub async fn initialize(&mut self) -> Result<(), SensorError> {
        self.dev.write_raw(&INIT_COMMAND).await.map_err(|e| {
            error!("AHT20 init command failed: {:?}", e);
            bus_error("send init command")
        })?;
        self.delay.delay_ms(INIT_SETTLE_MS).await;

        info!("AHT20 at {:#04x}: initialized", self.dev.address());
        self.initialized = true;

        Ok(())
    }

    /// Trigger a measurement and wait for the result.
    pub async fn measure(&mut self) -> Result<HumidityReadings, SensorError> {
        if !self.initialized {
            self.initialize().await?;
        }

        self.dev.write_raw(&TRIGGER_COMMAND).await.map_err(|e| {
            error!("AHT20 trigger failed: {:?}", e);
            bus_error("trigger measurement")
        })?;
        self.delay.delay_ms(MEASUREMENT_MS).await;

        self.wait_until_ready().await?;

        let mut frame = [0u8; 6];
        self.dev.read_raw(&mut frame).await.map_err(|e| {
            error!("AHT20 data read failed: {:?}", e);
            bus_error("read measurement")
        })?;

        Ok(convert(&frame))
    }

    pub fn release(self) -> (I, D) {
        (self.dev.release(), self.delay)
    }

    async fn read_status(&mut self) -> Result<u8, SensorError> {
        let mut status = [0u8; 1];
        self.dev.read_raw(&mut status).await.map_err(|e| {
            error!("AHT20 status read failed: {:?}", e);
            bus_error("read status")
        })?;
        Ok(status[0])
    }

    async fn wait_until_ready(&mut self) -> Result<(), SensorError> {
        let mut polls = 0;
        while self.read_status().await? & STATUS_BUSY != 0 {
            polls += 1;
            if polls >= MAX_BUSY_POLLS {
                warn!("AHT20 still busy after {} polls", polls);
                return Err(SensorError::Timeout {
                    sensor: SENSOR_NAME,
                    operation: "busy flag to clear",
                });
            }
            self.delay.delay_ms(BUSY_POLL_INTERVAL_MS).await;
        }
        Ok(())
    }
}

impl<I: I2c, D: DelayNs> Sensor for Aht20<I, D> {
    type Readings = HumidityReadings;

    const NAME: &'static str = SENSOR_NAME;

    async fn read(&mut self) -> Result<HumidityReadings, SensorError> {
        self.measure().await
    }
}

/// Convert a status+data frame into physical units.
///
/// Humidity occupies the 20 bits after the status byte, temperature the
/// 20 bits after that; they share the middle byte.
pub fn convert(frame: &[u8; 6]) -> HumidityReadings {
    let raw_humidity =
        ((frame[1] as u32) << 12) | ((frame[2] as u32) << 4) | ((frame[3] as u32) >> 4);
    let raw_temperature =
        (((frame[3] & 0x0F) as u32) << 16) | ((frame[4] as u32) << 8) | frame[5] as u32;

    HumidityReadings {
        temperature_celsius: raw_temperature as f32 / FULL_SCALE * 200.0 - 50.0,
        humidity_percent: raw_humidity as f32 / FULL_SCALE * 100.0,
    }
}

const fn bus_error(operation: &'static str) -> SensorError {
    SensorError::Bus {
        sensor: SENSOR_NAME,
        operation,
    }
}
