//! System configuration parameters
//!
//! Two kinds of configuration live here:
//!
//! - The **persisted region layout** and the numeric limits/defaults for the
//!   operating parameters.  These are compile-time constants because the
//!   byte offsets must stay stable across firmware updates.
//! - [`ControllerConfig`], the single parameterised description of a board
//!   build (pin assignments, relay/timer feature flags, poll timing).  Earlier
//!   firmware revisions forked the control loop per board; this replaces the
//!   forks.

use serde::{Deserialize, Serialize};

use crate::pins;

// --- Persisted region layout ---

/// Size of the durable parameter region in bytes (checksum slot included).
pub const REGION_LEN: usize = 512;
/// `calibration_factor: f32` (little-endian).
pub const CALIBRATION_FACTOR_OFFSET: usize = 0;
/// `weight_setpoint: f32` (little-endian).
pub const WEIGHT_SETPOINT_OFFSET: usize = 4;
/// `timer_threshold: f32` (little-endian).
pub const TIMER_THRESHOLD_OFFSET: usize = 8;
/// Layout tag (`u32`, little-endian).  Regions written before the tag existed
/// carry a blank slot here.
pub const LAYOUT_TAG_OFFSET: usize = 12;
/// Size of the trailing CRC-32 slot.
pub const CHECKSUM_LEN: usize = 4;
/// CRC-32 over `0..CHECKSUM_OFFSET`, stored little-endian.
pub const CHECKSUM_OFFSET: usize = REGION_LEN - CHECKSUM_LEN;

/// `b"SS"` + layout version 1.
pub const LAYOUT_TAG: u32 = 0x5353_0001;

// --- Parameter limits and defaults ---

/// Lowest accepted weight setpoint / timer threshold (kg).
pub const WEIGHT_LIMIT_MIN: f32 = 5.0;
/// Highest accepted weight setpoint / timer threshold (kg).
pub const WEIGHT_LIMIT_MAX: f32 = 30.0;
/// A calibration factor closer to zero than this divides readings into noise.
pub const CALIBRATION_FACTOR_MIN_ABS: f32 = 1e-3;

pub const DEFAULT_SETPOINT: f32 = 18.0;
pub const DEFAULT_CALIBRATION_FACTOR: f32 = 696.0;
/// Shares the setpoint bounds, so the default sits on the lower bound and is
/// therefore never above any valid setpoint.
pub const DEFAULT_TIMER_THRESHOLD: f32 = WEIGHT_LIMIT_MIN;

// --- Sampling / diagnostics ---

/// Raw readings averaged into one smoothed sample (and into a tare offset).
pub const SMOOTHING_SAMPLES: usize = 8;
/// Minimum interval between two "setpoint exceeded" notifications.
pub const NOTIFY_INTERVAL_MS: u32 = 1000;
/// Interval of the periodic weight report.
pub const WEIGHT_REPORT_INTERVAL_MS: u32 = 1000;
/// Settling time after power-up before the boot tare starts.
pub const STABILIZE_MS: u32 = 2000;
/// Boot gives up on the load cell after this long.
pub const BASELINE_TIMEOUT_MS: u32 = 5000;

// --- Network ---

pub const HTTP_PORT: u16 = 80;
pub const MDNS_HOSTNAME: &str = "SmartScale";

/// Pin assignment for one board build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinConfig {
    pub hx711_dout: i32,
    pub hx711_sck: i32,
    pub relay: i32,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            hx711_dout: pins::HX711_DOUT_GPIO,
            hx711_sck: pins::HX711_SCK_GPIO,
            relay: pins::RELAY_GPIO,
        }
    }
}

/// Board build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    // --- Feature flags ---
    /// Drive the relay latch (disable for timer-only builds).
    pub relay_enabled: bool,
    /// Run the elapsed-time timer (disable for relay-only builds).
    pub timer_enabled: bool,

    // --- Timing ---
    /// Poll loop period (milliseconds).
    pub poll_interval_ms: u32,
    /// "Setpoint exceeded" notification rate limit (milliseconds).
    pub notify_interval_ms: u32,
    /// Weight report period (milliseconds).
    pub report_interval_ms: u32,

    // --- Boot ---
    /// Settling time before the boot tare (milliseconds).
    pub stabilize_ms: u32,
    /// Boot fails if no stable baseline is reached within this (milliseconds).
    pub baseline_timeout_ms: u32,
    /// Zero the scale during boot.
    pub tare_on_boot: bool,

    pub pins: PinConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            relay_enabled: true,
            timer_enabled: true,

            poll_interval_ms: 10, // 100 Hz; HX711 delivers at 10/80 Hz
            notify_interval_ms: NOTIFY_INTERVAL_MS,
            report_interval_ms: WEIGHT_REPORT_INTERVAL_MS,

            stabilize_ms: STABILIZE_MS,
            baseline_timeout_ms: BASELINE_TIMEOUT_MS,
            tare_on_boot: true,

            pins: PinConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Reject combinations that would stall the poll loop or the boot sequence.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be > 0");
        }
        if self.notify_interval_ms == 0 {
            return Err("notify_interval_ms must be > 0");
        }
        if self.report_interval_ms == 0 {
            return Err("report_interval_ms must be > 0");
        }
        if self.stabilize_ms >= self.baseline_timeout_ms {
            return Err("stabilize_ms must be < baseline_timeout_ms");
        }
        let p = self.pins;
        if p.hx711_dout == p.hx711_sck || p.hx711_dout == p.relay || p.hx711_sck == p.relay {
            return Err("pin assignments must be distinct");
        }
        Ok(())
    }
}
