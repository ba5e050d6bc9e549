//! Wind speed from anemometer pulses
//!
//! Pulses → rotations → distance travelled by the cups → raw speed, then a
//! linear fit against a reference anemometer and a short moving average.

use core::f32::consts::TAU;

use heapless::Deque;
use serde::{Deserialize, Serialize};

use crate::config::StationConfig;

/// Number of calibrated samples in the moving average.
pub const WIND_WINDOW: usize = 5;

/// Fixed-capacity FIFO of the most recent samples and their mean.
#[derive(Debug, Clone, Default)]
pub struct RollingWindow<const N: usize> {
    values: Deque<f32, N>,
}

impl<const N: usize> RollingWindow<N> {
    pub const fn new() -> Self {
        Self {
            values: Deque::new(),
        }
    }

    /// Insert a value, evicting the oldest when full, and return the mean of
    /// the window.
    pub fn push(&mut self, value: f32) -> f32 {
        if self.values.is_full() {
            self.values.pop_front();
        }
        // Cannot fail: a slot was freed above if the deque was full
        let _ = self.values.push_back(value);
        self.average()
    }

    /// Mean of the current contents, 0 when empty.
    pub fn average(&self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f32>() / self.values.len() as f32
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Linear correction `slope * raw + offset` fitted against a reference
/// anemometer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindCalibration {
    pub slope: f32,
    pub offset: f32,
}

impl WindCalibration {
    pub fn apply(&self, raw_speed: f32) -> f32 {
        self.slope * raw_speed + self.offset
    }
}

/// One interval's worth of wind estimates, all in m/s.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindSample {
    pub raw: f32,
    pub calibrated: f32,
    pub smoothed: f32,
}

pub struct WindSpeedEstimator {
    magnets_per_revolution: u32,
    circumference_m: f32,
    calibration: WindCalibration,
    window: RollingWindow<WIND_WINDOW>,
}

impl WindSpeedEstimator {
    pub fn new(magnets_per_revolution: u32, radius_m: f32, calibration: WindCalibration) -> Self {
        Self {
            magnets_per_revolution,
            circumference_m: TAU * radius_m,
            calibration,
            window: RollingWindow::new(),
        }
    }

    pub fn from_config(config: &StationConfig) -> Self {
        Self::new(
            config.magnets_per_revolution,
            config.rotor_radius_m,
            config.wind_calibration,
        )
    }

    /// Uncalibrated cup speed. Zero when no time has elapsed or the rotor
    /// has no magnets configured.
    pub fn raw_speed(&self, pulses: u32, elapsed_seconds: f32) -> f32 {
        if elapsed_seconds <= 0.0 || self.magnets_per_revolution == 0 {
            return 0.0;
        }
        let rotations = pulses as f32 / self.magnets_per_revolution as f32;
        let distance_m = rotations * self.circumference_m;
        distance_m / elapsed_seconds
    }

    /// Derive the interval's wind speed and fold it into the moving average.
    pub fn update(&mut self, pulses: u32, elapsed_seconds: f32) -> WindSample {
        let raw = self.raw_speed(pulses, elapsed_seconds);
        let calibrated = self.calibration.apply(raw);
        let smoothed = self.window.push(calibrated);

        WindSample {
            raw,
            calibrated,
            smoothed,
        }
    }

    pub fn window(&self) -> &RollingWindow<WIND_WINDOW> {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station_estimator() -> WindSpeedEstimator {
        WindSpeedEstimator::new(
            3,
            0.15,
            WindCalibration {
                slope: 2.445645,
                offset: 0.0,
            },
        )
    }

    #[test]
    fn test_rolling_average_sequence() {
        let mut window = RollingWindow::<5>::new();
        let averages: Vec<f32> = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
            .iter()
            .map(|v| window.push(*v))
            .collect();
        assert_eq!(averages, vec![1.0, 1.5, 2.0, 2.5, 3.0, 4.0]);
        assert_eq!(window.len(), 5);
    }

    #[test]
    fn test_empty_window_averages_to_zero() {
        let window = RollingWindow::<5>::new();
        assert!(window.is_empty());
        assert_eq!(window.average(), 0.0);
    }

    #[test]
    fn test_raw_and_calibrated_speed() {
        let mut estimator = station_estimator();
        let sample = estimator.update(30, 5.0);

        assert!((sample.raw - 1.885).abs() < 0.001, "raw {}", sample.raw);
        assert!((sample.calibrated - 4.610).abs() < 0.001);
        assert_eq!(sample.smoothed, sample.calibrated);
    }

    #[test]
    fn test_zero_elapsed_time_is_calm() {
        let estimator = station_estimator();
        assert_eq!(estimator.raw_speed(30, 0.0), 0.0);
        assert_eq!(estimator.raw_speed(30, -1.0), 0.0);
    }

    #[test]
    fn test_offset_applies_even_without_pulses() {
        let mut estimator = WindSpeedEstimator::new(
            3,
            0.15,
            WindCalibration {
                slope: 2.0,
                offset: 0.3,
            },
        );
        let sample = estimator.update(0, 5.0);
        assert_eq!(sample.raw, 0.0);
        assert!((sample.calibrated - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_smoothing_follows_window() {
        let mut estimator = station_estimator();
        let first = estimator.update(30, 5.0);
        let second = estimator.update(0, 5.0);
        assert!((second.smoothed - first.calibrated / 2.0).abs() < 1e-5);
        assert_eq!(estimator.window().len(), 2);
    }
}
