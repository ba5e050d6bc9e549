//! Per-interval report records and their external forms.
//!
//! The text form is one line per report:
//!
//! ```text
//! T:21.5 H:40.2 P:1013.2 WS:1.23
//! T:ERR H:ERR P:ERR WS:1.23
//! ```
//!
//! Host tooling can instead consume COBS-framed postcard records.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::sampling::EnvironmentReading;
use crate::wind::WindSample;

/// Largest encoded frame, including the COBS overhead and terminator.
pub const MAX_FRAME_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub environment: EnvironmentReading,
    pub wind: WindSample,
    /// Pulses counted during the interval.
    pub pulses: u32,
    pub elapsed_seconds: f32,
}

impl ReportRecord {
    /// Smoothed wind speed in m/s.
    pub fn wind_speed(&self) -> f32 {
        self.wind.smoothed
    }

    /// Encode as a zero-terminated COBS frame into `buf`.
    pub fn encode_frame<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], postcard::Error> {
        postcard::to_slice_cobs(self, buf)
    }

    /// Decode a frame produced by [`ReportRecord::encode_frame`]. The buffer
    /// is decoded in place.
    pub fn decode_frame(frame: &mut [u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes_cobs(frame)
    }
}

impl fmt::Display for ReportRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env = &self.environment;
        if env.is_unavailable() {
            write!(f, "T:ERR H:ERR P:ERR WS:{:.2}", self.wind_speed())
        } else {
            write!(
                f,
                "T:{:.1} H:{:.1} P:{:.1} WS:{:.2}",
                env.temperature_celsius,
                env.humidity_percent,
                env.pressure_hpa,
                self.wind_speed()
            )
        }
    }
}

/// Consumer of finished reports: console, RTT channel, test collector.
pub trait ReportSink {
    fn emit(&mut self, record: &ReportRecord);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(environment: EnvironmentReading, smoothed: f32) -> ReportRecord {
        ReportRecord {
            environment,
            wind: WindSample {
                raw: 1.885,
                calibrated: 4.61,
                smoothed,
            },
            pulses: 30,
            elapsed_seconds: 5.0,
        }
    }

    #[test]
    fn test_text_line_for_valid_reading() {
        let r = record(
            EnvironmentReading {
                temperature_celsius: 21.46,
                humidity_percent: 40.21,
                pressure_hpa: 1013.24,
            },
            1.234,
        );
        assert_eq!(r.to_string(), "T:21.5 H:40.2 P:1013.2 WS:1.23");
    }

    #[test]
    fn test_text_line_for_sentinel_keeps_wind() {
        let r = record(EnvironmentReading::UNAVAILABLE, 4.61);
        assert_eq!(r.to_string(), "T:ERR H:ERR P:ERR WS:4.61");
    }

    #[test]
    fn test_frame_carries_sentinel() {
        let r = record(EnvironmentReading::UNAVAILABLE, 0.5);
        let mut buf = [0u8; MAX_FRAME_LEN];
        let frame = r.encode_frame(&mut buf).unwrap();
        assert_eq!(frame.last(), Some(&0));

        let decoded = ReportRecord::decode_frame(frame).unwrap();
        assert!(decoded.environment.is_unavailable());
        assert_eq!(decoded.wind_speed(), 0.5);
    }
}
