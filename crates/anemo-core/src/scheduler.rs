//! Fixed-interval reporting loop
//!
//! Every tick feeds the watchdog and toggles the status indicator. Once the
//! report interval has elapsed the scheduler drains the pulse counter,
//! updates the wind estimate, samples the environment sensors and hands a
//! [`ReportRecord`] to the sink. Sensor trouble degrades the record to
//! sentinel values; nothing stops the loop short of a watchdog reset.

use embedded_hal::digital::StatefulOutputPin;
use embedded_hal_async::delay::DelayNs;
use log::{debug, info, warn};

use crate::config::StationConfig;
use crate::pulse_counter::PulseCounter;
use crate::report::{ReportRecord, ReportSink};
use crate::sampling::SamplingOrchestrator;
use crate::sensors::{HumidityReadings, PressureReadings, Sensor};
use crate::wind::WindSpeedEstimator;

/// Millisecond tick source. Wraps around at `u32::MAX`; callers compare
/// timestamps with wrapping subtraction.
pub trait MonotonicClock {
    fn now_ms(&self) -> u32;
}

pub trait Watchdog {
    /// Restart the watchdog countdown.
    fn feed(&mut self);
}

pub struct ReportScheduler<'a, P, H, D> {
    pulses: &'a PulseCounter,
    estimator: WindSpeedEstimator,
    orchestrator: SamplingOrchestrator<P, H, D>,
    last_report_ms: u32,
    interval_ms: u32,
    max_retries: u32,
}

impl<'a, P, H, D> ReportScheduler<'a, P, H, D>
where
    P: Sensor<Readings = PressureReadings>,
    H: Sensor<Readings = HumidityReadings>,
    D: DelayNs,
{
    /// `start_ms` is the clock reading the first interval is measured from.
    pub fn new(
        pulses: &'a PulseCounter,
        estimator: WindSpeedEstimator,
        orchestrator: SamplingOrchestrator<P, H, D>,
        config: &StationConfig,
        start_ms: u32,
    ) -> Self {
        Self {
            pulses,
            estimator,
            orchestrator,
            last_report_ms: start_ms,
            interval_ms: config.report_interval_ms,
            max_retries: config.max_retries,
        }
    }

    /// Milliseconds since the last report, if a report is due.
    pub fn elapsed_if_due(&self, now_ms: u32) -> Option<u32> {
        let elapsed = now_ms.wrapping_sub(self.last_report_ms);
        (elapsed >= self.interval_ms).then_some(elapsed)
    }

    /// Close the current interval at `now_ms` and build its report.
    pub async fn report(&mut self, now_ms: u32) -> ReportRecord {
        let elapsed_ms = now_ms.wrapping_sub(self.last_report_ms);
        let elapsed_seconds = elapsed_ms as f32 / 1000.0;
        self.last_report_ms = now_ms;

        let pulses = self.pulses.snapshot_and_reset();
        let wind = self.estimator.update(pulses, elapsed_seconds);
        debug!(
            "Interval {} ms: {} pulses, raw {} m/s, calibrated {} m/s",
            elapsed_ms, pulses, wind.raw, wind.calibrated
        );

        let outcome = self.orchestrator.sample(self.max_retries).await;
        if outcome.attempts > 1 {
            info!("Environment sample took {} attempts", outcome.attempts);
        }

        ReportRecord {
            environment: outcome.reading,
            wind,
            pulses,
            elapsed_seconds,
        }
    }

    /// One pass of the main loop, without the trailing sleep.
    pub async fn tick<C, W, L, S>(
        &mut self,
        clock: &C,
        watchdog: &mut W,
        indicator: &mut L,
        sink: &mut S,
    ) -> Option<ReportRecord>
    where
        C: MonotonicClock,
        W: Watchdog,
        L: StatefulOutputPin,
        S: ReportSink,
    {
        watchdog.feed();
        if let Err(e) = indicator.toggle() {
            warn!("Status indicator toggle failed: {:?}", e);
        }

        let now_ms = clock.now_ms();
        self.elapsed_if_due(now_ms)?;

        let record = self.report(now_ms).await;
        sink.emit(&record);
        Some(record)
    }

    /// Run the station forever, sleeping `tick_ms` between ticks.
    pub async fn run<C, W, L, S, T>(
        &mut self,
        clock: &C,
        watchdog: &mut W,
        indicator: &mut L,
        sink: &mut S,
        delay: &mut T,
        tick_ms: u32,
    ) -> !
    where
        C: MonotonicClock,
        W: Watchdog,
        L: StatefulOutputPin,
        S: ReportSink,
        T: DelayNs,
    {
        info!(
            "Station running: report every {} ms, tick {} ms",
            self.interval_ms, tick_ms
        );
        loop {
            self.tick(clock, watchdog, indicator, sink).await;
            delay.delay_ms(tick_ms).await;
        }
    }

    pub fn estimator(&self) -> &WindSpeedEstimator {
        &self.estimator
    }
}
