//! Desktop simulator for the anemo-rs wind and environment station.
//!
//! Runs the real `anemo-core` drivers and scheduler against a register-level
//! model of the BMP280 and AHT20 and a thread that spins a virtual rotor.
//! Report lines go to stdout; logging goes through `env_logger`.
//!
//! # Settings
//!
//! | Variable                     | Effect                               |
//! |------------------------------|--------------------------------------|
//! | ANEMO_REPORT_INTERVAL_MS     | Report interval                      |
//! | ANEMO_MAX_RETRIES            | Sampling attempts per report         |
//! | ANEMO_WIND_SLOPE / _OFFSET   | Wind calibration                     |
//! | ANEMO_SIM_MEAN_WIND          | Mean simulated wind in m/s           |
//! | ANEMO_SIM_FAIL_EVERY         | Fail every Nth I2C transaction       |
//! | ANEMO_SIM_REPORTS            | Exit after this many reports         |

mod anemometer;
mod host;
mod settings;
mod sim_bus;
mod weather;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anemo_core::async_i2c_bus::{SharedI2cBus, SharedI2cDevice};
use anemo_core::pulse_counter::PulseCounter;
use anemo_core::sampling::SamplingOrchestrator;
use anemo_core::scheduler::{MonotonicClock, ReportScheduler};
use anemo_core::sensors::{Aht20, Bmp280};
use anemo_core::wind::WindSpeedEstimator;
use embassy_futures::block_on;
use embedded_hal_async::delay::DelayNs;
use log::{error, info, warn};

use host::{ConsoleLed, ConsoleSink, HostClock, HostDelay, LoggingWatchdog};
use settings::SimSettings;
use sim_bus::SimulatedBus;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = SimSettings::load();
    let config = settings.station;
    info!("Station config: {:?}", config);
    if !config.fits_watchdog() {
        warn!(
            "Worst-case report of {} ms may trip the {} ms watchdog",
            config.worst_case_report_ms(),
            config.watchdog_timeout_ms
        );
    }

    let clock = HostClock::start();
    let pulses: &'static PulseCounter = Box::leak(Box::new(PulseCounter::new(config.debounce_ms)));
    let running = Arc::new(AtomicBool::new(true));
    let rotor = anemometer::spawn(
        pulses,
        clock,
        settings.weather,
        config,
        Arc::clone(&running),
    );

    let bus: SharedI2cBus<SimulatedBus> = SharedI2cBus::new(SimulatedBus::new(
        clock,
        settings.weather,
        config.bmp280_address,
        config.aht20_address,
        settings.fail_every,
    ));

    let mut bmp280 = Bmp280::new(SharedI2cDevice::new(&bus), config.bmp280_address);
    let mut aht20 = Aht20::new(SharedI2cDevice::new(&bus), HostDelay, config.aht20_address);
    block_on(async {
        if let Err(e) = bmp280.initialize().await {
            error!("BMP280 init failed: {}", e);
        }
        if let Err(e) = aht20.initialize().await {
            error!("AHT20 init failed: {}", e);
        }
    });

    let orchestrator = SamplingOrchestrator::new(bmp280, aht20, HostDelay, config.retry_backoff_ms);
    let mut scheduler = ReportScheduler::new(
        pulses,
        WindSpeedEstimator::from_config(&config),
        orchestrator,
        &config,
        clock.now_ms(),
    );

    let mut watchdog = LoggingWatchdog::new(config.watchdog_timeout_ms);
    let mut led = ConsoleLed::default();
    let mut sink = ConsoleSink::default();
    let mut delay = HostDelay;

    block_on(async {
        loop {
            scheduler
                .tick(&clock, &mut watchdog, &mut led, &mut sink)
                .await;
            if settings.reports > 0 && sink.emitted >= settings.reports {
                break;
            }
            delay.delay_ms(config.tick_interval_ms).await;
        }
    });

    running.store(false, Ordering::Relaxed);
    if rotor.join().is_err() {
        error!("Rotor thread panicked");
    }
    info!(
        "Simulation finished: {} reports, {} watchdog resets",
        sink.emitted,
        watchdog.resets()
    );
}
