//! Bench check for the hall sensor wiring: prints whether a magnet is in
//! front of the sensor every 200 ms.

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Pull};
use esp_hal::timer::timg::TimerGroup;
use rtt_target::rprintln;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

esp_bootloader_esp_idf::esp_app_desc!();

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    rtt_target::rtt_init_print!();

    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()));
    esp_alloc::heap_allocator!(size: 8 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let hall = Input::new(
        peripherals.GPIO9,
        InputConfig::default().with_pull(Pull::Up),
    );
    rprintln!("Watching hall sensor on GPIO9, bring a magnet close");

    loop {
        // open-drain output, pulled low while a magnet is present
        if hall.is_low() {
            rprintln!("Magnet detected");
        } else {
            rprintln!("No magnet");
        }
        Timer::after(POLL_INTERVAL).await;
    }
}
