//! Hall sensor edge interrupt
//!
//! The anemometer magnet pulls the sensor output low once per pass. Every
//! falling edge lands in [`PULSES`] through the GPIO interrupt; the reporting
//! loop drains it once per interval.

use core::cell::RefCell;

use anemo_core::pulse_counter::{DEFAULT_DEBOUNCE_MS, PulseCounter};
use critical_section::Mutex;
use esp_hal::gpio::{Event, Input};
use esp_hal::{handler, ram};

/// Pulses counted since the last report.
pub static PULSES: PulseCounter = PulseCounter::new(DEFAULT_DEBOUNCE_MS);

static HALL_PIN: Mutex<RefCell<Option<Input<'static>>>> = Mutex::new(RefCell::new(None));

/// Arm falling-edge interrupts on `pin` and hand it to the edge handler.
///
/// [`on_hall_edge`] must already be registered with `Io::set_interrupt_handler`.
pub fn install(mut pin: Input<'static>) {
    critical_section::with(|cs| {
        pin.listen(Event::FallingEdge);
        HALL_PIN.borrow_ref_mut(cs).replace(pin);
    });
}

#[handler]
#[ram]
pub fn on_hall_edge() {
    let now_ms = embassy_time::Instant::now().as_millis() as u32;

    critical_section::with(|cs| {
        if let Some(pin) = HALL_PIN.borrow_ref_mut(cs).as_mut() {
            if pin.is_interrupt_set() {
                pin.clear_interrupt();
                PULSES.increment_if_debounced(now_ms);
            }
        }
    });
}
