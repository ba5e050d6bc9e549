//! Desktop stand-ins for the station's clock, delay, watchdog, status LED
//! and report output.

use std::convert::Infallible;
use std::time::{Duration, Instant};

use anemo_core::report::{MAX_FRAME_LEN, ReportRecord, ReportSink};
use anemo_core::scheduler::{MonotonicClock, Watchdog};
use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};
use embedded_hal_async::delay::DelayNs;
use log::{debug, error, trace, warn};

/// Milliseconds since the simulator started.
#[derive(Debug, Clone, Copy)]
pub struct HostClock {
    start: Instant,
}

impl HostClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn seconds(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }
}

impl MonotonicClock for HostClock {
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// Blocks the calling thread; the simulator drives futures with `block_on`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostDelay;

impl DelayNs for HostDelay {
    async fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns as u64));
    }
}

/// Reports what the hardware watchdog would have done.
pub struct LoggingWatchdog {
    timeout: Duration,
    last_feed: Instant,
    resets: u32,
}

impl LoggingWatchdog {
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms as u64),
            last_feed: Instant::now(),
            resets: 0,
        }
    }

    /// Resets the real device would have taken so far.
    pub fn resets(&self) -> u32 {
        self.resets
    }
}

impl Watchdog for LoggingWatchdog {
    fn feed(&mut self) {
        let starved = self.last_feed.elapsed();
        if starved > self.timeout {
            self.resets += 1;
            error!(
                "Watchdog starved for {} ms, the device would have reset",
                starved.as_millis()
            );
        }
        self.last_feed = Instant::now();
    }
}

#[derive(Debug, Default)]
pub struct ConsoleLed {
    on: bool,
}

impl ErrorType for ConsoleLed {
    type Error = Infallible;
}

impl OutputPin for ConsoleLed {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.on = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.on = true;
        trace!("LED on");
        Ok(())
    }
}

impl StatefulOutputPin for ConsoleLed {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.on)
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.on)
    }
}

/// Prints the text line to stdout and logs the encoded frame.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    pub emitted: u32,
}

impl ReportSink for ConsoleSink {
    fn emit(&mut self, record: &ReportRecord) {
        println!("{record}");
        self.emitted += 1;

        let mut buf = [0u8; MAX_FRAME_LEN];
        match record.encode_frame(&mut buf) {
            Ok(frame) => debug!("Frame ({} bytes): {:02x?}", frame.len(), frame),
            Err(e) => warn!("Failed to encode report frame: {:?}", e),
        }
    }
}
