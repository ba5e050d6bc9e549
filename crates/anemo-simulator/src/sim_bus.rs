//! Register-level I2C model of the BMP280 and AHT20
//!
//! The BMP280 image carries the datasheet calibration words; ADC results are
//! found by inverting the driver's own compensation so the reported values
//! track [`Weather`]. Optional fault injection drops every Nth transaction.

use anemo_core::sensors::Bmp280Calibration;
use embedded_hal_async::i2c::{self, ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use log::{debug, trace};

use crate::host::HostClock;
use crate::weather::Weather;

const ADC_MAX: i32 = 0xFFFFF;

/// Status reads reporting busy after each AHT20 trigger.
const AHT20_BUSY_POLLS: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimBusError {
    NoDevice(u8),
    Injected,
}

impl i2c::Error for SimBusError {
    fn kind(&self) -> ErrorKind {
        match self {
            SimBusError::NoDevice(_) => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            SimBusError::Injected => ErrorKind::ArbitrationLoss,
        }
    }
}

pub const DATASHEET_CALIBRATION: Bmp280Calibration = Bmp280Calibration {
    dig_t1: 27504,
    dig_t2: 26435,
    dig_t3: -1000,
    dig_p1: 36477,
    dig_p2: -10685,
    dig_p3: 3024,
    dig_p4: 2855,
    dig_p5: 140,
    dig_p6: -7,
    dig_p7: 15500,
    dig_p8: -14600,
    dig_p9: 6000,
};

pub struct SimulatedBus {
    clock: HostClock,
    weather: Weather,
    bmp280_address: u8,
    aht20_address: u8,
    bmp280_registers: [u8; 256],
    bmp280_pointer: u8,
    aht20_frame: [u8; 6],
    aht20_busy: u8,
    /// Fail every Nth transaction; 0 disables injection.
    fail_every: u32,
    transactions: u32,
}

impl SimulatedBus {
    pub fn new(
        clock: HostClock,
        weather: Weather,
        bmp280_address: u8,
        aht20_address: u8,
        fail_every: u32,
    ) -> Self {
        let mut bmp280_registers = [0u8; 256];
        let c = &DATASHEET_CALIBRATION;
        let words = [
            c.dig_t1, c.dig_t2 as u16, c.dig_t3 as u16, c.dig_p1, c.dig_p2 as u16,
            c.dig_p3 as u16, c.dig_p4 as u16, c.dig_p5 as u16, c.dig_p6 as u16,
            c.dig_p7 as u16, c.dig_p8 as u16, c.dig_p9 as u16,
        ];
        for (i, word) in words.iter().enumerate() {
            let at = 0x88 + 2 * i;
            bmp280_registers[at..at + 2].copy_from_slice(&word.to_le_bytes());
        }

        Self {
            clock,
            weather,
            bmp280_address,
            aht20_address,
            bmp280_registers,
            bmp280_pointer: 0,
            aht20_frame: [0x18, 0, 0, 0, 0, 0],
            aht20_busy: 0,
            fail_every,
            transactions: 0,
        }
    }

    fn refresh_bmp280(&mut self) {
        let t = self.clock.seconds();
        let temperature = self.weather.temperature_c(t) + 0.2;
        let pressure = self.weather.pressure_hpa(t);

        let adc_t = adc_for_temperature(temperature);
        let t_fine = DATASHEET_CALIBRATION.compensate_temperature(adc_t).t_fine;
        let adc_p = adc_for_pressure(pressure, t_fine);

        let p = ((adc_p as u32) << 4).to_be_bytes();
        let t = ((adc_t as u32) << 4).to_be_bytes();
        self.bmp280_registers[0xF7..0xFA].copy_from_slice(&p[1..]);
        self.bmp280_registers[0xFA..0xFD].copy_from_slice(&t[1..]);
        trace!("BMP280 model: adc_t {} adc_p {}", adc_t, adc_p);
    }

    fn trigger_aht20(&mut self) {
        let t = self.clock.seconds();
        let temperature = self.weather.temperature_c(t) - 0.2;
        let humidity = self.weather.humidity_percent(t);

        let full_scale = (1u32 << 20) as f32;
        let raw_h = ((humidity / 100.0 * full_scale) as u32).min(0xFFFFF);
        let raw_t = (((temperature + 50.0) / 200.0 * full_scale) as u32).min(0xFFFFF);

        self.aht20_frame = [
            0x18,
            (raw_h >> 12) as u8,
            (raw_h >> 4) as u8,
            (((raw_h & 0x0F) << 4) | (raw_t >> 16)) as u8,
            (raw_t >> 8) as u8,
            raw_t as u8,
        ];
        self.aht20_busy = AHT20_BUSY_POLLS;
    }

    fn aht20_status(&mut self) -> u8 {
        if self.aht20_busy > 0 {
            self.aht20_busy -= 1;
            0x98
        } else {
            0x18
        }
    }
}

impl ErrorType for SimulatedBus {
    type Error = SimBusError;
}

impl I2c for SimulatedBus {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.transactions = self.transactions.wrapping_add(1);
        if self.fail_every > 0 && self.transactions % self.fail_every == 0 {
            debug!("Injecting bus fault on transaction {}", self.transactions);
            return Err(SimBusError::Injected);
        }

        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) if address == self.bmp280_address => {
                    if let Some((&register, data)) = bytes.split_first() {
                        self.bmp280_pointer = register;
                        for (offset, value) in data.iter().enumerate() {
                            let at = (register as usize + offset) % 256;
                            self.bmp280_registers[at] = *value;
                        }
                    }
                }
                Operation::Read(buf) if address == self.bmp280_address => {
                    if self.bmp280_pointer == 0xF7 || self.bmp280_pointer == 0xFA {
                        self.refresh_bmp280();
                    }
                    let start = self.bmp280_pointer as usize;
                    let end = (start + buf.len()).min(256);
                    buf[..end - start].copy_from_slice(&self.bmp280_registers[start..end]);
                }
                Operation::Write(bytes) if address == self.aht20_address => {
                    if bytes.first() == Some(&0xAC) {
                        self.trigger_aht20();
                    }
                }
                Operation::Read(buf) if address == self.aht20_address => {
                    if buf.len() == 1 {
                        buf[0] = self.aht20_status();
                    } else {
                        let n = buf.len().min(6);
                        buf[..n].copy_from_slice(&self.aht20_frame[..n]);
                    }
                }
                _ => return Err(SimBusError::NoDevice(address)),
            }
        }
        Ok(())
    }
}

/// Raw temperature reading that compensates to `celsius`.
fn adc_for_temperature(celsius: f32) -> i32 {
    let target = (celsius * 100.0).round() as i32;
    // compensated temperature rises with the raw value
    search(|adc| DATASHEET_CALIBRATION.compensate_temperature(adc).centi_celsius >= target)
}

/// Raw pressure reading that compensates to `hpa` at `t_fine`.
fn adc_for_pressure(hpa: f32, t_fine: i32) -> i32 {
    let target = (hpa as f64 * 25600.0) as i64;
    // compensated pressure falls as the raw value rises
    search(|adc| DATASHEET_CALIBRATION.compensate_pressure(adc, t_fine) <= target)
}

/// Smallest ADC value for which `reached` holds.
fn search(reached: impl Fn(i32) -> bool) -> i32 {
    let (mut lo, mut hi) = (0, ADC_MAX);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if reached(mid) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_compensation_round_trips_conditions() {
        let adc_t = adc_for_temperature(21.37);
        let t = DATASHEET_CALIBRATION.compensate_temperature(adc_t);
        assert!((t.centi_celsius - 2137).abs() <= 1);

        let adc_p = adc_for_pressure(1009.2, t.t_fine);
        let readings = DATASHEET_CALIBRATION.compensate(adc_t, adc_p);
        assert!((readings.pressure_hpa - 1009.2).abs() < 0.01);
    }

    #[test]
    fn test_datasheet_point_is_found() {
        let adc_t = adc_for_temperature(25.08);
        assert_eq!(DATASHEET_CALIBRATION.compensate_temperature(adc_t).centi_celsius, 2508);
    }
}
