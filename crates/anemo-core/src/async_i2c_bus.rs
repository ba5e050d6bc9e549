//! Async I2C bus sharing for the station sensors
//!
//! The BMP280 and AHT20 sit on the same physical bus. Each driver owns a
//! [`SharedI2cDevice`] handle and the handle locks the bus only for the
//! duration of a single transaction, so the AHT20's 80 ms conversion wait never
//! holds the bus.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};

/// The bus type shared between sensor handles.
pub type SharedI2cBus<T> = Mutex<CriticalSectionRawMutex, T>;

/// One device's view of a shared async I2C bus.
///
/// # Example
///
/// ```rust,ignore
/// use anemo_core::async_i2c_bus::{SharedI2cBus, SharedI2cDevice};
/// use static_cell::StaticCell;
///
/// static I2C_BUS: StaticCell<SharedI2cBus<esp_hal::i2c::master::I2c<'static, esp_hal::Async>>> = StaticCell::new();
///
/// let i2c = /* ... create async I2C ... */;
/// let i2c_bus = I2C_BUS.init(SharedI2cBus::new(i2c));
///
/// let bmp280_i2c = SharedI2cDevice::new(i2c_bus);
/// let aht20_i2c = SharedI2cDevice::new(i2c_bus);
/// ```
pub struct SharedI2cDevice<'a, T> {
    bus: &'a SharedI2cBus<T>,
}

impl<'a, T> SharedI2cDevice<'a, T> {
    #[inline]
    pub const fn new(bus: &'a SharedI2cBus<T>) -> Self {
        Self { bus }
    }
}

impl<T> ErrorType for SharedI2cDevice<'_, T>
where
    T: ErrorType,
{
    type Error = T::Error;
}

impl<T> I2c for SharedI2cDevice<'_, T>
where
    T: I2c,
{
    #[inline]
    async fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.read(address, read).await
    }

    #[inline]
    async fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.write(address, write).await
    }

    /// Register reads go through here; the register pointer write and the
    /// data read happen under one lock so another device cannot interleave.
    #[inline]
    async fn write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.write_read(address, write, read).await
    }

    #[inline]
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.transaction(address, operations).await
    }
}
