//! Station configuration, fixed at startup.

use serde::{Deserialize, Serialize};

use crate::pulse_counter::DEFAULT_DEBOUNCE_MS;
use crate::sensors::{aht20, bmp280};
use crate::wind::WindCalibration;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct StationConfig {
    pub bmp280_address: u8,
    pub aht20_address: u8,

    /// Magnets on the rotor; one pulse per magnet per revolution.
    pub magnets_per_revolution: u32,
    pub rotor_radius_m: f32,
    pub wind_calibration: WindCalibration,

    pub report_interval_ms: u32,
    /// Main loop sleep between ticks.
    pub tick_interval_ms: u32,
    pub debounce_ms: u32,
    /// Hardware watchdog timeout; must stay well above the worst-case tick.
    pub watchdog_timeout_ms: u32,

    pub max_retries: u32,
    pub retry_backoff_ms: u32,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            bmp280_address: bmp280::DEFAULT_ADDRESS,
            aht20_address: aht20::DEFAULT_ADDRESS,
            magnets_per_revolution: 3,
            rotor_radius_m: 0.15,
            wind_calibration: WindCalibration {
                slope: 2.445645,
                offset: 0.0,
            },
            report_interval_ms: 5000,
            tick_interval_ms: 10,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            watchdog_timeout_ms: 8000,
            max_retries: 3,
            retry_backoff_ms: 100,
        }
    }
}

impl StationConfig {
    /// Worst-case time spent inside one report, assuming every attempt
    /// runs the AHT20 busy poll to its limit and then fails.
    pub const fn worst_case_report_ms(&self) -> u32 {
        let aht20_ms = 80 + 10 * aht20::MAX_BUSY_POLLS;
        self.max_retries * (aht20_ms + self.retry_backoff_ms)
    }

    /// Whether a worst-case report plus one tick fits inside the watchdog
    /// window.
    pub const fn fits_watchdog(&self) -> bool {
        self.worst_case_report_ms() + self.tick_interval_ms < self.watchdog_timeout_ms
    }
}
