//! Retrying environmental sampling
//!
//! Reads both sensors, averages their temperatures and checks the result
//! against physical bounds. Failures are retried with a fixed backoff; when
//! the budget runs out the caller gets [`EnvironmentReading::UNAVAILABLE`]
//! rather than an error, so the station keeps reporting wind.

use core::ops::RangeInclusive;

use embedded_hal_async::delay::DelayNs;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::sensors::{HumidityReadings, PressureReadings, Sensor, SensorError};

pub const TEMPERATURE_RANGE_C: RangeInclusive<f32> = -40.0..=90.0;
pub const HUMIDITY_RANGE_PERCENT: RangeInclusive<f32> = 0.0..=100.0;
pub const PRESSURE_RANGE_HPA: RangeInclusive<f32> = 300.0..=1100.0;

/// Averaged temperature, humidity and pressure for one report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentReading {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
    pub pressure_hpa: f32,
}

impl EnvironmentReading {
    /// Sentinel reported when no valid reading could be taken.
    pub const UNAVAILABLE: Self = Self {
        temperature_celsius: -999.0,
        humidity_percent: -1.0,
        pressure_hpa: -1.0,
    };

    pub fn is_unavailable(&self) -> bool {
        *self == Self::UNAVAILABLE
    }

    pub fn is_valid(&self) -> bool {
        is_valid(
            self.temperature_celsius,
            self.humidity_percent,
            self.pressure_hpa,
        )
    }
}

/// Physical plausibility check, bounds inclusive.
pub fn is_valid(temperature_celsius: f32, humidity_percent: f32, pressure_hpa: f32) -> bool {
    TEMPERATURE_RANGE_C.contains(&temperature_celsius)
        && HUMIDITY_RANGE_PERCENT.contains(&humidity_percent)
        && PRESSURE_RANGE_HPA.contains(&pressure_hpa)
}

/// What [`SamplingOrchestrator::sample`] ended up with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleOutcome {
    pub reading: EnvironmentReading,
    pub attempts: u32,
    /// The failure behind the last unsuccessful attempt, if any.
    pub last_error: Option<SensorError>,
}

pub struct SamplingOrchestrator<P, H, D> {
    pressure: P,
    humidity: H,
    delay: D,
    backoff_ms: u32,
}

impl<P, H, D> SamplingOrchestrator<P, H, D>
where
    P: Sensor<Readings = PressureReadings>,
    H: Sensor<Readings = HumidityReadings>,
    D: DelayNs,
{
    pub const fn new(pressure: P, humidity: H, delay: D, backoff_ms: u32) -> Self {
        Self {
            pressure,
            humidity,
            delay,
            backoff_ms,
        }
    }

    /// Try up to `max_retries` times for a plausible reading.
    ///
    /// Never fails: exhaustion yields [`EnvironmentReading::UNAVAILABLE`].
    pub async fn sample(&mut self, max_retries: u32) -> SampleOutcome {
        let mut last_error = None;

        for attempt in 1..=max_retries {
            match self.attempt().await {
                Ok(reading) => {
                    debug!("Environment sample valid on attempt {}", attempt);
                    return SampleOutcome {
                        reading,
                        attempts: attempt,
                        last_error,
                    };
                }
                Err(e) => {
                    warn!(
                        "Environment sample attempt {}/{} failed: {}",
                        attempt, max_retries, e
                    );
                    last_error = Some(e);
                    self.delay.delay_ms(self.backoff_ms).await;
                }
            }
        }

        error!(
            "Environment sensors unavailable after {} attempts",
            max_retries
        );
        SampleOutcome {
            reading: EnvironmentReading::UNAVAILABLE,
            attempts: max_retries,
            last_error,
        }
    }

    async fn attempt(&mut self) -> Result<EnvironmentReading, SensorError> {
        let humidity = self.humidity.read().await?;
        let pressure = self.pressure.read().await?;

        let reading = EnvironmentReading {
            temperature_celsius: (humidity.temperature_celsius + pressure.temperature_celsius)
                / 2.0,
            humidity_percent: humidity.humidity_percent,
            pressure_hpa: pressure.pressure_hpa,
        };

        if reading.is_valid() {
            Ok(reading)
        } else {
            Err(SensorError::Implausible {
                temperature_celsius: reading.temperature_celsius,
                humidity_percent: reading.humidity_percent,
                pressure_hpa: reading.pressure_hpa,
            })
        }
    }

    pub fn sensors_mut(&mut self) -> (&mut P, &mut H) {
        (&mut self.pressure, &mut self.humidity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{Aht20, Bmp280};
    use crate::async_i2c_bus::{SharedI2cBus, SharedI2cDevice};
    use crate::testing::{Aht20Model, Bmp280Model, RecordingDelay, ScriptedSensor, StationBus};
    use embassy_futures::block_on;

    const PRESSURE_OK: PressureReadings = PressureReadings {
        temperature_celsius: 21.0,
        pressure_hpa: 1013.0,
    };
    const HUMIDITY_OK: HumidityReadings = HumidityReadings {
        temperature_celsius: 23.0,
        humidity_percent: 45.0,
    };
    const BUS_DOWN: SensorError = SensorError::Bus {
        sensor: "scripted",
        operation: "read",
    };

    #[test]
    fn test_is_valid_bounds_are_inclusive() {
        assert!(is_valid(-40.0, 50.0, 1000.0));
        assert!(is_valid(90.0, 50.0, 1000.0));
        assert!(!is_valid(-41.0, 50.0, 1000.0));
        assert!(!is_valid(90.1, 50.0, 1000.0));

        assert!(is_valid(20.0, 0.0, 1000.0));
        assert!(is_valid(20.0, 100.0, 1000.0));
        assert!(!is_valid(20.0, -0.1, 1000.0));
        assert!(!is_valid(20.0, 100.1, 1000.0));

        assert!(is_valid(20.0, 50.0, 300.0));
        assert!(is_valid(20.0, 50.0, 1100.0));
        assert!(!is_valid(20.0, 50.0, 299.9));
        assert!(!is_valid(20.0, 50.0, 1100.1));
    }

    #[test]
    fn test_sentinel_is_not_valid() {
        assert!(!EnvironmentReading::UNAVAILABLE.is_valid());
        assert!(EnvironmentReading::UNAVAILABLE.is_unavailable());
    }

    #[test]
    fn test_first_valid_attempt_returns_immediately() {
        let delay = RecordingDelay::default();
        let mut orchestrator = SamplingOrchestrator::new(
            ScriptedSensor::always(Ok(PRESSURE_OK)),
            ScriptedSensor::always(Ok(HUMIDITY_OK)),
            delay.clone(),
            100,
        );

        let outcome = block_on(orchestrator.sample(3));
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.last_error, None);
        assert_eq!(
            outcome.reading,
            EnvironmentReading {
                temperature_celsius: 22.0,
                humidity_percent: 45.0,
                pressure_hpa: 1013.0,
            }
        );
        assert!(delay.take().is_empty());
    }

    #[test]
    fn test_always_failing_bus_yields_sentinel_after_three_attempts() {
        let delay = RecordingDelay::default();
        let humidity = ScriptedSensor::<HumidityReadings>::always(Err(BUS_DOWN));
        let calls = humidity.calls.clone();
        let mut orchestrator = SamplingOrchestrator::new(
            ScriptedSensor::always(Ok(PRESSURE_OK)),
            humidity,
            delay.clone(),
            100,
        );

        let outcome = block_on(orchestrator.sample(3));
        assert_eq!(outcome.reading, EnvironmentReading::UNAVAILABLE);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.last_error, Some(BUS_DOWN));
        assert_eq!(calls.get(), 3);
        assert_eq!(delay.take(), vec![100, 100, 100]);
    }

    #[test]
    fn test_recovers_after_transient_failure() {
        let delay = RecordingDelay::default();
        let pressure = ScriptedSensor::new(vec![Err(BUS_DOWN)], Ok(PRESSURE_OK));
        let mut orchestrator = SamplingOrchestrator::new(
            pressure,
            ScriptedSensor::always(Ok(HUMIDITY_OK)),
            delay.clone(),
            100,
        );

        let outcome = block_on(orchestrator.sample(3));
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.last_error, Some(BUS_DOWN));
        assert!(outcome.reading.is_valid());
        assert_eq!(delay.take(), vec![100]);
    }

    #[test]
    fn test_implausible_reading_is_retried() {
        let delay = RecordingDelay::default();
        let wild = PressureReadings {
            temperature_celsius: 21.0,
            pressure_hpa: 0.0,
        };
        let pressure = ScriptedSensor::new(vec![Ok(wild), Ok(wild)], Ok(PRESSURE_OK));
        let mut orchestrator = SamplingOrchestrator::new(
            pressure,
            ScriptedSensor::always(Ok(HUMIDITY_OK)),
            delay.clone(),
            100,
        );

        let outcome = block_on(orchestrator.sample(3));
        assert_eq!(outcome.attempts, 3);
        assert!(matches!(
            outcome.last_error,
            Some(SensorError::Implausible { .. })
        ));
        assert_eq!(outcome.reading.pressure_hpa, 1013.0);
        assert_eq!(delay.take(), vec![100, 100]);
    }

    #[test]
    fn test_zero_retries_reports_sentinel_without_reading() {
        let humidity = ScriptedSensor::<HumidityReadings>::always(Ok(HUMIDITY_OK));
        let calls = humidity.calls.clone();
        let mut orchestrator = SamplingOrchestrator::new(
            ScriptedSensor::always(Ok(PRESSURE_OK)),
            humidity,
            RecordingDelay::default(),
            100,
        );

        let outcome = block_on(orchestrator.sample(0));
        assert!(outcome.reading.is_unavailable());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_real_drivers_on_shared_bus() {
        // BMP280 datasheet example (25.08 C) and AHT20 at 50 %RH / 25 C
        let bus: SharedI2cBus<StationBus> = SharedI2cBus::new(StationBus::new(
            Bmp280Model::datasheet_example(),
            Aht20Model::new(0x80000, 0x60000),
        ));
        let delay = RecordingDelay::default();
        let bmp = Bmp280::new(SharedI2cDevice::new(&bus), 0x77);
        let aht = Aht20::new(SharedI2cDevice::new(&bus), delay.clone(), 0x38);
        let mut orchestrator = SamplingOrchestrator::new(bmp, aht, delay.clone(), 100);

        let outcome = block_on(orchestrator.sample(3));
        assert_eq!(outcome.attempts, 1);
        assert!((outcome.reading.temperature_celsius - 25.04).abs() < 0.01);
        assert!((outcome.reading.humidity_percent - 50.0).abs() < 0.01);
        assert!((outcome.reading.pressure_hpa - 1006.53).abs() < 0.01);
    }

    #[test]
    fn test_real_drivers_fall_back_to_sentinel_when_bus_is_dead() {
        let mut model = StationBus::new(
            Bmp280Model::datasheet_example(),
            Aht20Model::new(0x80000, 0x60000),
        );
        model.fail_all = true;
        let bus: SharedI2cBus<StationBus> = SharedI2cBus::new(model);
        let delay = RecordingDelay::default();
        let bmp = Bmp280::new(SharedI2cDevice::new(&bus), 0x77);
        let aht = Aht20::new(SharedI2cDevice::new(&bus), delay.clone(), 0x38);
        let mut orchestrator = SamplingOrchestrator::new(bmp, aht, delay.clone(), 100);

        let outcome = block_on(orchestrator.sample(3));
        assert!(outcome.reading.is_unavailable());
        assert_eq!(delay.take(), vec![100, 100, 100]);
    }
}
