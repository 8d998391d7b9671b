//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ScaleService (domain)
//! ```
//!
//! Driven adapters (durable region, load cell, relay, clock, event sinks)
//! implement these traits.  The [`ScaleService`](super::service::ScaleService)
//! and the [`ParameterStore`](crate::store::ParameterStore) consume them via
//! generics, so the domain core never touches hardware directly.

use crate::sensors::load_cell::WeightSample;

// ───────────────────────────────────────────────────────────────
// Durable region port (driven adapter: domain ↔ NVS / EEPROM)
// ───────────────────────────────────────────────────────────────

/// A fixed-size, byte-addressable durable region.
///
/// Writes land in a staging copy; [`commit`](RegionPort::commit) makes them
/// durable.  Bytes written but not committed are lost on power loss, which
/// is exactly the partial-write case the store's checksum guards against.
pub trait RegionPort {
    /// Region size in bytes.
    fn len(&self) -> usize;

    /// Fill `buf` from `offset`.  Reads see uncommitted writes.
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Stage `data` at `offset`.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;

    /// Flush staged writes to durable storage.
    fn commit(&mut self) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Interrupt gate (driven adapter: domain → interrupt controller)
// ───────────────────────────────────────────────────────────────

/// Masks the sampling interrupt source around durable writes.
///
/// Calls are always paired: the store never returns with the source masked.
pub trait IrqGate {
    fn disable_sampling_irq(&mut self);
    fn enable_sampling_irq(&mut self);
}

/// Gate for builds and tests with no sampling interrupt.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIrqGate;

impl IrqGate for NoIrqGate {
    fn disable_sampling_irq(&mut self) {}
    fn enable_sampling_irq(&mut self) {}
}

// ───────────────────────────────────────────────────────────────
// Sample port (driven adapter: load cell → domain)
// ───────────────────────────────────────────────────────────────

/// The sampling collaborator.  Every method is non-blocking.
pub trait SamplePort {
    /// Consume a pending data-ready signal, if any, and fold the new
    /// conversion into the smoothed sample.  Returns `true` when the
    /// sample changed.
    fn refresh(&mut self, now_ms: u64) -> bool;

    /// Last known smoothed sample.
    fn read_latest_sample(&self) -> WeightSample;

    /// Start zeroing the baseline over the next few conversions.
    fn request_tare(&mut self);

    fn tare_in_progress(&self) -> bool;

    /// Apply a new scale factor to subsequent samples.
    fn set_calibration_factor(&mut self, factor: f32);

    /// Derive the factor that makes the current load read as `mass`.
    /// `None` when the current reading cannot produce a usable factor.
    fn calibration_for_known_mass(&self, mass: f32) -> Option<f32>;
}

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Binary actuator.  Both commands are idempotent.
pub trait RelayPort {
    fn energize(&mut self);
    fn de_energize(&mut self);
    fn is_energized(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock since boot.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, status
/// page, test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`RegionPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Access past the end of the region.
    OutOfBounds,
    /// The storage backend reported a failure.
    Io,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "access out of bounds"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}
