//! Register-level I/O over an async I2C bus
//!
//! Multi-byte values on these parts come in both byte orders: the BMP280
//! stores its calibration words little-endian and its ADC results
//! big-endian (MSB first).

use embedded_hal_async::i2c::I2c;

/// An I2C device at a fixed 7-bit address.
pub struct RegisterDevice<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> RegisterDevice<I> {
    pub const fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Release the underlying bus handle.
    pub fn release(self) -> I {
        self.i2c
    }

    /// Read `buf.len()` bytes starting at `register`.
    pub async fn read_block(&mut self, register: u8, buf: &mut [u8]) -> Result<(), I::Error> {
        self.i2c.write_read(self.address, &[register], buf).await
    }

    /// Read bytes without addressing a register first.
    pub async fn read_raw(&mut self, buf: &mut [u8]) -> Result<(), I::Error> {
        self.i2c.read(self.address, buf).await
    }

    /// Write a single byte to `register`.
    pub async fn write_register(&mut self, register: u8, value: u8) -> Result<(), I::Error> {
        self.i2c.write(self.address, &[register, value]).await
    }

    /// Write a raw command sequence.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> Result<(), I::Error> {
        self.i2c.write(self.address, bytes).await
    }

    pub async fn read_u16_le(&mut self, register: u8) -> Result<u16, I::Error> {
        let mut buf = [0u8; 2];
        self.read_block(register, &mut buf).await?;
        Ok(u16::from_le_bytes(buf))
    }

    pub async fn read_i16_le(&mut self, register: u8) -> Result<i16, I::Error> {
        let mut buf = [0u8; 2];
        self.read_block(register, &mut buf).await?;
        Ok(i16::from_le_bytes(buf))
    }

    pub async fn read_u16_be(&mut self, register: u8) -> Result<u16, I::Error> {
        let mut buf = [0u8; 2];
        self.read_block(register, &mut buf).await?;
        Ok(u16::from_be_bytes(buf))
    }

    pub async fn read_i16_be(&mut self, register: u8) -> Result<i16, I::Error> {
        let mut buf = [0u8; 2];
        self.read_block(register, &mut buf).await?;
        Ok(i16::from_be_bytes(buf))
    }

    /// Read three registers as an unsigned value, MSB first.
    pub async fn read_u24_be(&mut self, register: u8) -> Result<u32, I::Error> {
        let mut buf = [0u8; 3];
        self.read_block(register, &mut buf).await?;
        Ok(u24_from_be(buf))
    }

    /// Read three registers as an unsigned value, LSB first.
    pub async fn read_u24_le(&mut self, register: u8) -> Result<u32, I::Error> {
        let mut buf = [0u8; 3];
        self.read_block(register, &mut buf).await?;
        Ok(u24_from_le(buf))
    }
}

#[inline]
pub const fn u24_from_be(bytes: [u8; 3]) -> u32 {
    ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32
}

#[inline]
pub const fn u24_from_le(bytes: [u8; 3]) -> u32 {
    ((bytes[2] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[0] as u32
}
