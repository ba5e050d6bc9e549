//! Hardware initialization for the station
//!
//! Pin assignment (M5Stack CoreS3 port A/B):
//!
//! | Signal      | GPIO |
//! |-------------|------|
//! | I2C SDA     | 12   |
//! | I2C SCL     | 11   |
//! | Hall sensor | 9    |
//! | Status LED  | 8    |

use anemo_core::scheduler::{MonotonicClock, Watchdog};
use embassy_time::Instant;
use esp_hal::i2c::master::{Config as I2cConfig, ConfigError, I2c};
use esp_hal::peripherals::{GPIO11, GPIO12, I2C0, TIMG1};
use esp_hal::time::{Duration, Rate};
use esp_hal::timer::timg::{MwdtStage, Wdt};
use esp_hal::Async;
use log::info;

pub type StationI2c = I2c<'static, Async>;

/// Create the sensor I2C bus at standard mode (100 kHz).
pub fn create_i2c_bus(
    i2c0: I2C0<'static>,
    sda: GPIO12<'static>,
    scl: GPIO11<'static>,
) -> Result<StationI2c, ConfigError> {
    Ok(I2c::new(i2c0, I2cConfig::default().with_frequency(Rate::from_khz(100)))?
        .with_sda(sda)
        .with_scl(scl)
        .into_async())
}

/// TIMG1 main watchdog, resetting the chip when not fed in time.
pub struct StationWatchdog {
    wdt: Wdt<TIMG1<'static>>,
}

impl StationWatchdog {
    pub fn start(mut wdt: Wdt<TIMG1<'static>>, timeout_ms: u32) -> Self {
        wdt.set_timeout(MwdtStage::Stage0, Duration::from_millis(timeout_ms as u64));
        wdt.enable();
        wdt.feed();
        info!("Watchdog armed with {} ms timeout", timeout_ms);
        Self { wdt }
    }
}

impl Watchdog for StationWatchdog {
    fn feed(&mut self) {
        self.wdt.feed();
    }
}

/// Milliseconds since boot from the embassy time driver, truncated to `u32`.
pub struct EmbassyClock;

impl MonotonicClock for EmbassyClock {
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}
