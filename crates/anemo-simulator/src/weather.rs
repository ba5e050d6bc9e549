//! Synthetic weather driving the simulated sensors and rotor.

use std::f32::consts::TAU;

/// Slowly varying conditions as a function of seconds since start.
#[derive(Debug, Clone, Copy)]
pub struct Weather {
    pub base_temperature_c: f32,
    pub base_humidity_percent: f32,
    pub base_pressure_hpa: f32,
    pub mean_wind_m_s: f32,
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            base_temperature_c: 18.0,
            base_humidity_percent: 55.0,
            base_pressure_hpa: 1013.0,
            mean_wind_m_s: 4.0,
        }
    }
}

impl Weather {
    pub fn temperature_c(&self, t: f32) -> f32 {
        // BMP280 and AHT20 disagree slightly; each adds its own offset
        self.base_temperature_c + 3.0 * (TAU * t / 600.0).sin()
    }

    pub fn humidity_percent(&self, t: f32) -> f32 {
        (self.base_humidity_percent + 10.0 * (TAU * t / 900.0).cos()).clamp(0.0, 100.0)
    }

    pub fn pressure_hpa(&self, t: f32) -> f32 {
        self.base_pressure_hpa + 2.5 * (TAU * t / 1800.0).sin()
    }

    /// Calibrated wind speed with gusts layered on the mean.
    pub fn wind_m_s(&self, t: f32) -> f32 {
        let gusts = 1.5 * (TAU * t / 45.0).sin() + 0.6 * (TAU * t / 7.0).sin();
        (self.mean_wind_m_s + gusts).max(0.0)
    }
}
