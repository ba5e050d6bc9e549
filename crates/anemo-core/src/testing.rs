//! Host-side doubles for the unit tests: a register-level model of the
//! station's I2C bus, a delay that records what it was asked to sleep, and
//! scripted sensors.

use core::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{self, ErrorKind, ErrorType, I2c, Operation};

use crate::sensors::{Sensor, SensorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockI2cError;

impl i2c::Error for MockI2cError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

pub struct Bmp280Model {
    pub registers: [u8; 256],
    pointer: u8,
}

impl Bmp280Model {
    /// Register image matching the worked example in the BMP280 datasheet.
    pub fn datasheet_example() -> Self {
        let words: [i32; 12] = [
            27504, 26435, -1000, 36477, -10685, 3024, 2855, 140, -7, 15500, -14600, 6000,
        ];
        let mut registers = [0u8; 256];
        for (i, word) in words.iter().enumerate() {
            let bytes = (*word as u16).to_le_bytes();
            registers[0x88 + 2 * i] = bytes[0];
            registers[0x89 + 2 * i] = bytes[1];
        }
        let mut model = Self {
            registers,
            pointer: 0,
        };
        model.set_adc(519888, 415148);
        model
    }

    /// Store 20-bit ADC results the way the sensor left-aligns them.
    pub fn set_adc(&mut self, adc_t: u32, adc_p: u32) {
        let p = (adc_p << 4).to_be_bytes();
        let t = (adc_t << 4).to_be_bytes();
        self.registers[0xF7..0xFA].copy_from_slice(&p[1..]);
        self.registers[0xFA..0xFD].copy_from_slice(&t[1..]);
    }
}

pub struct Aht20Model {
    pub raw_humidity: u32,
    pub raw_temperature: u32,
    /// Status reads that report busy after each trigger.
    pub busy_polls: u32,
    busy_remaining: u32,
}

impl Aht20Model {
    pub fn new(raw_humidity: u32, raw_temperature: u32) -> Self {
        Self {
            raw_humidity,
            raw_temperature,
            busy_polls: 0,
            busy_remaining: 0,
        }
    }

    fn status(&mut self) -> u8 {
        // calibrated bit always set
        if self.busy_remaining > 0 {
            self.busy_remaining -= 1;
            0x80 | 0x18
        } else {
            0x18
        }
    }

    fn frame(&self) -> [u8; 6] {
        let h = self.raw_humidity & 0xFFFFF;
        let t = self.raw_temperature & 0xFFFFF;
        [
            0x18,
            (h >> 12) as u8,
            (h >> 4) as u8,
            (((h & 0x0F) << 4) | (t >> 16)) as u8,
            (t >> 8) as u8,
            t as u8,
        ]
    }
}

/// Both station sensors behind one bus.
pub struct StationBus {
    pub bmp280: Bmp280Model,
    pub aht20: Aht20Model,
    pub writes: Vec<(u8, Vec<u8>)>,
    pub fail_all: bool,
    /// Fail this many transactions, then recover.
    pub fail_next: u32,
}

impl StationBus {
    pub fn new(bmp280: Bmp280Model, aht20: Aht20Model) -> Self {
        Self {
            bmp280,
            aht20,
            writes: Vec::new(),
            fail_all: false,
            fail_next: 0,
        }
    }
}

impl ErrorType for StationBus {
    type Error = MockI2cError;
}

impl I2c for StationBus {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.fail_all {
            return Err(MockI2cError);
        }
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(MockI2cError);
        }

        for op in operations.iter_mut() {
            match (address, op) {
                (0x77, Operation::Write(bytes)) => {
                    self.writes.push((address, bytes.to_vec()));
                    if let Some((&register, data)) = bytes.split_first() {
                        self.bmp280.pointer = register;
                        for (offset, value) in data.iter().enumerate() {
                            self.bmp280.registers[register as usize + offset] = *value;
                        }
                    }
                }
                (0x77, Operation::Read(buf)) => {
                    let start = self.bmp280.pointer as usize;
                    buf.copy_from_slice(&self.bmp280.registers[start..start + buf.len()]);
                }
                (0x38, Operation::Write(bytes)) => {
                    self.writes.push((address, bytes.to_vec()));
                    if bytes[0] == 0xAC {
                        self.aht20.busy_remaining = self.aht20.busy_polls;
                    }
                }
                (0x38, Operation::Read(buf)) => {
                    if buf.len() == 1 {
                        buf[0] = self.aht20.status();
                    } else {
                        let frame = self.aht20.frame();
                        buf.copy_from_slice(&frame[..buf.len()]);
                    }
                }
                _ => return Err(MockI2cError),
            }
        }
        Ok(())
    }
}

/// Records every requested sleep in milliseconds.
#[derive(Clone, Default)]
pub struct RecordingDelay {
    log: Rc<RefCell<Vec<u32>>>,
}

impl RecordingDelay {
    /// Drain the recorded sleeps.
    pub fn take(&self) -> Vec<u32> {
        self.log.borrow_mut().drain(..).collect()
    }
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.log.borrow_mut().push(ns / 1_000_000);
    }

    async fn delay_us(&mut self, us: u32) {
        self.log.borrow_mut().push(us / 1_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.log.borrow_mut().push(ms);
    }
}

/// A sensor that replays a fixed script of results.
pub struct ScriptedSensor<R> {
    script: VecDeque<Result<R, SensorError>>,
    /// Result returned once the script runs out.
    fallback: Result<R, SensorError>,
    pub calls: Rc<Cell<u32>>,
}

impl<R: Copy> ScriptedSensor<R> {
    pub fn new(script: Vec<Result<R, SensorError>>, fallback: Result<R, SensorError>) -> Self {
        Self {
            script: script.into(),
            fallback,
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub fn always(result: Result<R, SensorError>) -> Self {
        Self::new(Vec::new(), result)
    }
}

impl<R: Copy> Sensor for ScriptedSensor<R> {
    type Readings = R;

    const NAME: &'static str = "scripted";

    async fn read(&mut self) -> Result<R, SensorError> {
        self.calls.set(self.calls.get() + 1);
        self.script.pop_front().unwrap_or(self.fallback)
    }
}
