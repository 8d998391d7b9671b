//! Interrupt → poll signalling.
//!
//! The HX711 pulls DOUT low when a conversion is ready.  The GPIO ISR does
//! exactly one thing: set [`DATA_READY`].  The poll loop swaps the flag back
//! to `false` and performs the 24-bit read, the averaging and the float
//! maths itself, so interrupt latency stays bounded.
//!
//! ```text
//! ┌─────────────┐  signal()   ┌────────────┐  take()   ┌──────────────┐
//! │ DOUT ISR    │────────────▶│ DATA_READY │──────────▶│  Poll loop   │
//! └─────────────┘             └────────────┘           └──────────────┘
//! ```

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Single-slot "new data available" signal.
///
/// Signals arriving before the previous one is taken coalesce; the ADC only
/// ever holds one pending conversion anyway.
pub struct DataReadyFlag {
    ready: AtomicBool,
    /// Total signals raised; diagnostics only.
    raised: AtomicU32,
}

impl DataReadyFlag {
    pub const fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            raised: AtomicU32::new(0),
        }
    }

    /// ISR side.  Lock-free, no allocation.
    pub fn signal(&self) {
        self.ready.store(true, Ordering::Release);
        self.raised.fetch_add(1, Ordering::Relaxed);
    }

    /// Poll side.  Atomically clears the flag and returns whether it was set.
    pub fn take(&self) -> bool {
        self.ready.swap(false, Ordering::Acquire)
    }

    pub fn raised(&self) -> u32 {
        self.raised.load(Ordering::Relaxed)
    }
}

impl Default for DataReadyFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// `static` because ESP-IDF ISR callbacks cannot capture state.
pub static DATA_READY: DataReadyFlag = DataReadyFlag::new();

/// Entry point for the DOUT falling-edge ISR.
pub fn data_ready_isr() {
    DATA_READY.signal();
}
