#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use anemo_core::async_i2c_bus::{SharedI2cBus, SharedI2cDevice};
use anemo_core::config::StationConfig;
use anemo_core::sampling::SamplingOrchestrator;
use anemo_core::scheduler::{MonotonicClock, ReportScheduler};
use anemo_core::sensors::{Aht20, Bmp280};
use anemo_core::wind::WindSpeedEstimator;
use anemo_firmware::hardware::{self, EmbassyClock, StationI2c, StationWatchdog};
use anemo_firmware::hall;
use anemo_firmware::rtt_sink::RttReportSink;
use embassy_executor::Spawner;
use embassy_time::Delay;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Io, Level, Output, OutputConfig, Pull};
use esp_hal::timer::timg::TimerGroup;
use log::{error, info, warn};
use rtt_target::rtt_init;
use static_cell::StaticCell;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

static I2C_BUS: StaticCell<SharedI2cBus<StationI2c>> = StaticCell::new();

#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    let channels = rtt_init! {
        up: {
            0: { size: 1024, name: "Terminal" }
            1: { size: 512, name: "Reports" }
        }
    };
    rtt_target::set_print_channel(channels.up.0);
    rtt_target::init_logger();

    let config = StationConfig::default();
    if !config.fits_watchdog() {
        warn!(
            "Worst-case report of {} ms may trip the {} ms watchdog",
            config.worst_case_report_ms(),
            config.watchdog_timeout_ms
        );
    }

    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()));

    esp_alloc::heap_allocator!(size: 16 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let timg1 = TimerGroup::new(peripherals.TIMG1);
    let mut watchdog = StationWatchdog::start(timg1.wdt, config.watchdog_timeout_ms);

    let i2c = hardware::create_i2c_bus(peripherals.I2C0, peripherals.GPIO12, peripherals.GPIO11)
        .expect("Failed to configure I2C bus");
    let bus = I2C_BUS.init(SharedI2cBus::new(i2c));

    // A failed init is retried lazily on the first read.
    let mut bmp280 = Bmp280::new(SharedI2cDevice::new(bus), config.bmp280_address);
    match bmp280.initialize().await {
        Ok(()) => info!("BMP280 ready"),
        Err(e) => error!("BMP280 init failed: {}", e),
    }
    let mut aht20 = Aht20::new(SharedI2cDevice::new(bus), Delay, config.aht20_address);
    match aht20.initialize().await {
        Ok(()) => info!("AHT20 ready"),
        Err(e) => error!("AHT20 init failed: {}", e),
    }

    let mut io = Io::new(peripherals.IO_MUX);
    io.set_interrupt_handler(hall::on_hall_edge);
    hall::install(Input::new(
        peripherals.GPIO9,
        InputConfig::default().with_pull(Pull::Up),
    ));
    let mut led = Output::new(peripherals.GPIO8, Level::Low, OutputConfig::default());

    let clock = EmbassyClock;
    let orchestrator = SamplingOrchestrator::new(bmp280, aht20, Delay, config.retry_backoff_ms);
    let mut scheduler = ReportScheduler::new(
        &hall::PULSES,
        WindSpeedEstimator::from_config(&config),
        orchestrator,
        &config,
        clock.now_ms(),
    );
    let mut sink = RttReportSink::new(channels.up.1);

    scheduler
        .run(
            &clock,
            &mut watchdog,
            &mut led,
            &mut sink,
            &mut Delay,
            config.tick_interval_ms,
        )
        .await
}
