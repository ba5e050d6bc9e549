//! Simulated rotor: a thread delivering hall sensor edges, contact bounce
//! included, at the rate the current wind implies.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anemo_core::config::StationConfig;
use anemo_core::pulse_counter::PulseCounter;
use anemo_core::scheduler::MonotonicClock;
use log::trace;

use crate::host::HostClock;
use crate::weather::Weather;

/// Spacing of the spurious second edge after each real one.
const BOUNCE_MS: u64 = 2;
/// Longest sleep between edges, so a calm spell still notices `running`.
const MAX_IDLE: Duration = Duration::from_millis(200);

/// Edges per second for a calibrated wind speed.
pub fn pulse_rate_hz(config: &StationConfig, wind_m_s: f32) -> f32 {
    let calibration = config.wind_calibration;
    if calibration.slope <= 0.0 {
        return 0.0;
    }
    let raw_m_s = ((wind_m_s - calibration.offset) / calibration.slope).max(0.0);
    let circumference_m = std::f32::consts::TAU * config.rotor_radius_m;
    raw_m_s / circumference_m * config.magnets_per_revolution as f32
}

pub fn spawn(
    pulses: &'static PulseCounter,
    clock: HostClock,
    weather: Weather,
    config: StationConfig,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            let rate = pulse_rate_hz(&config, weather.wind_m_s(clock.seconds()));
            if rate <= 0.0 {
                thread::sleep(MAX_IDLE);
                continue;
            }

            let period = Duration::from_secs_f32(1.0 / rate);
            if period > MAX_IDLE {
                thread::sleep(MAX_IDLE);
                continue;
            }
            thread::sleep(period);

            pulses.increment_if_debounced(clock.now_ms());
            thread::sleep(Duration::from_millis(BOUNCE_MS));
            if !pulses.increment_if_debounced(clock.now_ms()) {
                trace!("Bounce rejected");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_rate_inverts_estimator() {
        let config = StationConfig::default();
        // 30 pulses in 5 s is 4.61 m/s calibrated
        let rate = pulse_rate_hz(&config, 4.6099);
        assert!((rate - 6.0).abs() < 0.01);
        assert_eq!(pulse_rate_hz(&config, 0.0), 0.0);
    }
}
