//! BMP280 pressure and temperature driver
//!
//! Compensation follows the vendor's 64-bit integer algorithm bit for bit.
//! Floating point only appears in the final unit conversion.

use super::{PressureReadings, RegisterDevice, Sensor, SensorError};
use embedded_hal_async::i2c::I2c;
use log::{error, info};

/// I2C address with SDO pulled high.
pub const DEFAULT_ADDRESS: u8 = 0x77;

const SENSOR_NAME: &str = "BMP280";

mod reg {
    pub const DIG_T1: u8 = 0x88;
    pub const DIG_T2: u8 = 0x8A;
    pub const DIG_T3: u8 = 0x8C;
    pub const DIG_P1: u8 = 0x8E;
    pub const DIG_P2: u8 = 0x90;
    pub const DIG_P3: u8 = 0x92;
    pub const DIG_P4: u8 = 0x94;
    pub const DIG_P5: u8 = 0x96;
    pub const DIG_P6: u8 = 0x98;
    pub const DIG_P7: u8 = 0x9A;
    pub const DIG_P8: u8 = 0x9C;
    pub const DIG_P9: u8 = 0x9E;
    pub const CTRL_MEAS: u8 = 0xF4;
    pub const CONFIG: u8 = 0xF5;
    pub const PRESS_MSB: u8 = 0xF7;
    pub const TEMP_MSB: u8 = 0xFA;
}

/// Normal mode, temperature x1, pressure x1.
const CTRL_MEAS_NORMAL_X1: u8 = 0x27;
/// 1000 ms standby, IIR filter coefficient 4.
const CONFIG_STANDBY_1000MS_FILTER_4: u8 = 0xA0;

/// Factory trimming coefficients from the sensor's NVM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bmp280Calibration {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
}

/// Result of temperature compensation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompensatedTemperature {
    /// Fine temperature carried into pressure compensation.
    pub t_fine: i32,
    /// Temperature in hundredths of a degree Celsius.
    pub centi_celsius: i32,
}

impl Bmp280Calibration {
    async fn load<I: I2c>(dev: &mut RegisterDevice<I>) -> Result<Self, I::Error> {
        Ok(Self {
            dig_t1: dev.read_u16_le(reg::DIG_T1).await?,
            dig_t2: dev.read_i16_le(reg::DIG_T2).await?,
            dig_t3: dev.read_i16_le(reg::DIG_T3).await?,
            dig_p1: dev.read_u16_le(reg::DIG_P1).await?,
            dig_p2: dev.read_i16_le(reg::DIG_P2).await?,
            dig_p3: dev.read_i16_le(reg::DIG_P3).await?,
            dig_p4: dev.read_i16_le(reg::DIG_P4).await?,
            dig_p5: dev.read_i16_le(reg::DIG_P5).await?,
            dig_p6: dev.read_i16_le(reg::DIG_P6).await?,
            dig_p7: dev.read_i16_le(reg::DIG_P7).await?,
            dig_p8: dev.read_i16_le(reg::DIG_P8).await?,
            dig_p9: dev.read_i16_le(reg::DIG_P9).await?,
        })
    }

    /// Compensate a 20-bit raw temperature.
    pub fn compensate_temperature(&self, adc_t: i32) -> CompensatedTemperature {
        let adc_t = adc_t as i64;
        let t1 = self.dig_t1 as i64;
        let t2 = self.dig_t2 as i64;
        let t3 = self.dig_t3 as i64;

        let var1 = (((adc_t >> 3) - (t1 << 1)) * t2) >> 11;
        let delta = (adc_t >> 4) - t1;
        let var2 = (((delta * delta) >> 12) * t3) >> 14;

        let t_fine = (var1 + var2) as i32;
        let centi_celsius = (t_fine * 5 + 128) >> 8;

        CompensatedTemperature {
            t_fine,
            centi_celsius,
        }
    }

    /// Compensate a 20-bit raw pressure.
    ///
    /// Returns pressure in Pa as Q24.8 fixed point, or 0 when the
    /// intermediate divisor is zero.
    pub fn compensate_pressure(&self, adc_p: i32, t_fine: i32) -> i64 {
        let p1 = self.dig_p1 as i64;
        let p2 = self.dig_p2 as i64;
        let p3 = self.dig_p3 as i64;
        let p4 = self.dig_p4 as i64;
        let p5 = self.dig_p5 as i64;
        let p6 = self.dig_p6 as i64;
        let p7 = self.dig_p7 as i64;
        let p8 = self.dig_p8 as i64;
        let p9 = self.dig_p9 as i64;

        let mut var1 = t_fine as i64 - 128000;
        let mut var2 = var1 * var1 * p6;
        var2 += (var1 * p5) << 17;
        var2 += p4 << 35;
        var1 = ((var1 * var1 * p3) >> 8) + ((var1 * p2) << 12);
        var1 = (((1i64 << 47) + var1) * p1) >> 33;

        if var1 == 0 {
            return 0;
        }

        let mut p = 1048576 - adc_p as i64;
        p = (((p << 31) - var2) * 3125) / var1;
        let var1 = (p9 * (p >> 13) * (p >> 13)) >> 25;
        let var2 = (p8 * p) >> 19;

        ((p + var1 + var2) >> 8) + (p7 << 4)
    }

    /// Compensate a raw temperature/pressure pair into physical units.
    pub fn compensate(&self, adc_t: i32, adc_p: i32) -> PressureReadings {
        let temperature = self.compensate_temperature(adc_t);
        let pressure_q24_8 = self.compensate_pressure(adc_p, temperature.t_fine);

        PressureReadings {
            temperature_celsius: temperature.centi_celsius as f32 / 100.0,
            pressure_hpa: (pressure_q24_8 as f64 / 25600.0) as f32,
        }
    }
}

pub struct Bmp280<I> {
    dev: RegisterDevice<I>,
    calibration: Option<Bmp280Calibration>,
}

impl<I: I2c> Bmp280<I> {
    /// Create the driver without touching the bus.
    pub const fn new(i2c: I, address: u8) -> Self {
        Self {
            dev: RegisterDevice::new(i2c, address),
            calibration: None,
        }
    }

    /// Load the calibration set and configure continuous sampling.
    ///
    /// This should be called once during startup. If it fails, the next
    /// [`Sensor::read`] retries it.
    pub async fn initialize(&mut self) -> Result<(), SensorError> {
        let calibration = Bmp280Calibration::load(&mut self.dev)
            .await
            .map_err(|e| {
                error!("BMP280 calibration load failed: {:?}", e);
                bus_error("load calibration")
            })?;

        self.dev
            .write_register(reg::CTRL_MEAS, CTRL_MEAS_NORMAL_X1)
            .await
            .map_err(|e| {
                error!("BMP280 ctrl_meas write failed: {:?}", e);
                bus_error("write ctrl_meas")
            })?;

        self.dev
            .write_register(reg::CONFIG, CONFIG_STANDBY_1000MS_FILTER_4)
            .await
            .map_err(|e| {
                error!("BMP280 config write failed: {:?}", e);
                bus_error("write config")
            })?;

        info!(
            "BMP280 at {:#04x}: calibration loaded, normal mode",
            self.dev.address()
        );
        self.calibration = Some(calibration);

        Ok(())
    }

    /// Calibration set, once initialized.
    pub fn calibration(&self) -> Option<&Bmp280Calibration> {
        self.calibration.as_ref()
    }

    pub fn release(self) -> I {
        self.dev.release()
    }

    async fn read_adc(&mut self, register: u8, operation: &'static str) -> Result<i32, SensorError> {
        let raw = self.dev.read_u24_be(register).await.map_err(|e| {
            error!("BMP280 {} failed: {:?}", operation, e);
            bus_error(operation)
        })?;
        Ok((raw >> 4) as i32)
    }
}

impl<I: I2c> Sensor for Bmp280<I> {
    type Readings = PressureReadings;

    const NAME: &'static str = SENSOR_NAME;

    async fn read(&mut self) -> Result<PressureReadings, SensorError> {
        let calibration = match self.calibration {
            Some(calibration) => calibration,
            None => {
                self.initialize().await?;
                self.calibration.unwrap_or_default()
            }
        };

        let adc_t = self.read_adc(reg::TEMP_MSB, "read raw temperature").await?;
        let adc_p = self.read_adc(reg::PRESS_MSB, "read raw pressure").await?;

        Ok(calibration.compensate(adc_t, adc_p))
    }
}

const fn bus_error(operation: &'static str) -> SensorError {
    SensorError::Bus {
        sensor: SENSOR_NAME,
        operation,
    }
}
