//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (HTTP routes,
//! the serial console) that the [`ScaleService`](super::service::ScaleService)
//! interprets and acts upon from the poll loop.

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppCommand {
    /// Zero the scale over the next few conversions.
    Tare,

    /// Persist a new weight setpoint (kg).
    SetSetpoint(f32),

    /// Persist and apply a new calibration factor.
    SetCalibrationFactor(f32),

    /// Persist a new timer threshold (kg).
    SetTimerThreshold(f32),

    /// Derive the calibration factor from a known mass (kg) on the scale.
    CalibrateKnownMass(f32),

    /// Clear the relay latch.
    ResetRelay,

    /// Manual relay override.
    ToggleRelay,

    /// Turn the periodic weight report on or off.
    ToggleWeightReport,
}
