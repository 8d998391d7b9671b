//! Sensor subsystem.
//!
//! [`load_cell::LoadCell`] turns raw 24-bit conversions from any
//! [`RawAdc`] into smoothed, tared, calibrated weight samples.  The HX711
//! driver in [`crate::drivers::hx711`] is the production source.

pub mod load_cell;

use crate::error::SamplingError;

/// A raw ADC conversion source.
pub trait RawAdc {
    /// A conversion is waiting to be clocked out.
    fn is_ready(&mut self) -> bool;

    /// Clock out one signed conversion.  Call only after `is_ready()`.
    fn read_raw(&mut self) -> Result<i32, SamplingError>;
}
