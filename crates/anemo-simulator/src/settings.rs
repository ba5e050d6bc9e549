//! Simulator settings: [`StationConfig`] defaults overlaid with `ANEMO_*`
//! environment variables, read from a `.env` file when one is present.

use std::env;
use std::str::FromStr;

use anemo_core::config::StationConfig;
use log::{info, warn};

use crate::weather::Weather;

#[derive(Debug, Clone, Copy)]
pub struct SimSettings {
    pub station: StationConfig,
    pub weather: Weather,
    /// Stop after this many reports; 0 runs until interrupted.
    pub reports: u32,
    /// Fail every Nth I2C transaction; 0 disables injection.
    pub fail_every: u32,
}

impl SimSettings {
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded settings from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => warn!("Ignoring unreadable .env: {}", e),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str, default| override_or(&lookup, key, default);

        let defaults = StationConfig::default();
        let mut station = defaults;
        station.report_interval_ms = get("ANEMO_REPORT_INTERVAL_MS", defaults.report_interval_ms);
        station.tick_interval_ms = get("ANEMO_TICK_INTERVAL_MS", defaults.tick_interval_ms);
        station.debounce_ms = get("ANEMO_DEBOUNCE_MS", defaults.debounce_ms);
        station.max_retries = get("ANEMO_MAX_RETRIES", defaults.max_retries);
        station.retry_backoff_ms = get("ANEMO_RETRY_BACKOFF_MS", defaults.retry_backoff_ms);
        station.watchdog_timeout_ms =
            get("ANEMO_WATCHDOG_TIMEOUT_MS", defaults.watchdog_timeout_ms);
        station.magnets_per_revolution =
            get("ANEMO_MAGNETS_PER_REVOLUTION", defaults.magnets_per_revolution);
        station.rotor_radius_m = override_or(&lookup, "ANEMO_ROTOR_RADIUS_M", defaults.rotor_radius_m);
        station.wind_calibration.slope = override_or(
            &lookup,
            "ANEMO_WIND_SLOPE",
            defaults.wind_calibration.slope,
        );
        station.wind_calibration.offset = override_or(
            &lookup,
            "ANEMO_WIND_OFFSET",
            defaults.wind_calibration.offset,
        );

        let mut weather = Weather::default();
        weather.mean_wind_m_s = override_or(&lookup, "ANEMO_SIM_MEAN_WIND", weather.mean_wind_m_s);

        Self {
            station,
            weather,
            reports: get("ANEMO_SIM_REPORTS", 0),
            fail_every: get("ANEMO_SIM_FAIL_EVERY", 0),
        }
    }
}

fn override_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{}={:?} is not valid, keeping default", key, raw);
            default
        }),
    }
}
