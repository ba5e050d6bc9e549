//! Anemometer pulse counting shared between the edge interrupt and the
//! main task.
//!
//! The interrupt handler calls [`PulseCounter::increment_if_debounced`] on
//! every falling edge of the hall sensor; the reporting loop drains the count
//! with [`PulseCounter::snapshot_and_reset`]. Both run inside a critical
//! section that covers only a handful of instructions, so interrupt latency
//! stays negligible.
//!
//! ```rust,ignore
//! static PULSES: PulseCounter = PulseCounter::new(DEFAULT_DEBOUNCE_MS);
//!
//! #[handler]
//! fn on_hall_edge() {
//!     PULSES.increment_if_debounced(now_ms());
//! }
//!
//! let pulses = PULSES.snapshot_and_reset();
//! ```

use core::cell::Cell;

use critical_section::Mutex;

/// Hall sensor edges closer together than this are contact bounce.
pub const DEFAULT_DEBOUNCE_MS: u32 = 10;

#[derive(Debug, Clone, Copy)]
struct CounterState {
    count: u32,
    /// Timestamp of the last accepted edge, `None` until the first one.
    last_edge_ms: Option<u32>,
}

pub struct PulseCounter {
    state: Mutex<Cell<CounterState>>,
    debounce_ms: u32,
}

impl PulseCounter {
    pub const fn new(debounce_ms: u32) -> Self {
        Self {
            state: Mutex::new(Cell::new(CounterState {
                count: 0,
                last_edge_ms: None,
            })),
            debounce_ms,
        }
    }

    pub const fn debounce_ms(&self) -> u32 {
        self.debounce_ms
    }

    /// Count an edge at `now_ms` unless it falls inside the debounce window
    /// of the previously accepted edge.
    ///
    /// Safe to call from interrupt context: no allocation, no blocking, and a
    /// fixed amount of work. Returns whether the edge was counted.
    pub fn increment_if_debounced(&self, now_ms: u32) -> bool {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();

            let accepted = match state.last_edge_ms {
                None => true,
                Some(last) => now_ms.wrapping_sub(last) >= self.debounce_ms,
            };

            if accepted {
                state.count = state.count.saturating_add(1);
                state.last_edge_ms = Some(now_ms);
                cell.set(state);
            }

            accepted
        })
    }

    /// Take the pulses counted since the previous snapshot and restart from
    /// zero. The debounce reference is kept so a bounce straddling the
    /// snapshot is still rejected.
    pub fn snapshot_and_reset(&self) -> u32 {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            let pulses = state.count;
            state.count = 0;
            cell.set(state);
            pulses
        })
    }

    /// Current count without resetting it.
    pub fn peek(&self) -> u32 {
        critical_section::with(|cs| self.state.borrow(cs).get().count)
    }
}
