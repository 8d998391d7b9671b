//! Unified error types for the SmartScale firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the boot
//! sequence and the command handlers report failures uniformly.  All
//! variants are `Copy` so they can travel inside [`AppEvent`]s and boot
//! reports without allocation.
//!
//! [`AppEvent`]: crate::app::events::AppEvent

use core::fmt;

use crate::app::ports::StorageError;
use crate::store::layout::Param;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error {
    /// A parameter write was rejected before touching durable storage.
    Validation(ValidationError),
    /// The persisted region failed an integrity check.
    Integrity(IntegrityError),
    /// The durable region could not be read or written.
    Storage(StorageError),
    /// The load cell did not deliver usable data.
    Sampling(SamplingError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "validation: {e}"),
            Self::Integrity(e) => write!(f, "integrity: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Sampling(e) => write!(f, "sampling: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidationError {
    /// NaN, infinite, or outside the parameter's accepted range.
    OutOfRange { param: Param, value: f32 },
    /// The timer threshold must not exceed the weight setpoint.
    ThresholdAboveSetpoint { threshold: f32, setpoint: f32 },
    /// Known-mass calibration needs a positive mass and a loaded cell.
    InvalidReferenceMass(f32),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { param, value } => {
                write!(f, "{} out of range: {value}", param.name())
            }
            Self::ThresholdAboveSetpoint {
                threshold,
                setpoint,
            } => write!(
                f,
                "timer threshold {threshold} above weight setpoint {setpoint}"
            ),
            Self::InvalidReferenceMass(mass) => {
                write!(f, "cannot calibrate against {mass} kg")
            }
        }
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Integrity errors
// ---------------------------------------------------------------------------

/// Integrity failures are detected at boot only and are always repaired in
/// place.  They are reported, never propagated as a boot failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityError {
    /// Stored CRC does not match the region contents; full reset.
    ChecksumMismatch { stored: u32, computed: u32 },
    /// Region carries a layout tag from an unknown firmware; full reset.
    LayoutMismatch { tag: u32 },
    /// One field was NaN or out of range under a valid checksum; field reset.
    FieldCorrupt(Param),
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChecksumMismatch { stored, computed } => write!(
                f,
                "checksum mismatch (stored {stored:#010x}, computed {computed:#010x})"
            ),
            Self::LayoutMismatch { tag } => write!(f, "unknown layout tag {tag:#010x}"),
            Self::FieldCorrupt(param) => write!(f, "{} corrupt", param.name()),
        }
    }
}

impl From<IntegrityError> for Error {
    fn from(e: IntegrityError) -> Self {
        Self::Integrity(e)
    }
}

// ---------------------------------------------------------------------------
// Sampling errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingError {
    /// The ADC never signalled a conversion within the baseline timeout.
    Timeout,
    /// Conversions arrived but the boot tare did not complete in time.
    TareTimeout,
    /// The ADC stopped responding mid-read.
    SignalDropout,
}

impl fmt::Display for SamplingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "no data from load cell"),
            Self::TareTimeout => write!(f, "tare did not complete"),
            Self::SignalDropout => write!(f, "signal dropout"),
        }
    }
}

impl From<SamplingError> for Error {
    fn from(e: SamplingError) -> Self {
        Self::Sampling(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

/// Convenience alias used throughout the firmware.
pub type Result<T> = core::result::Result<T, Error>;
