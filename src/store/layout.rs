//! Byte layout of the persisted parameter region.
//!
//! ```text
//!   0    4    8    12   16                       508  512
//!   ├────┼────┼────┼────┼────── reserved ─────────┼────┤
//!   cal  set  thr  tag                             crc
//! ```
//!
//! All multi-byte values are little-endian.  The CRC covers `0..508`.

use serde::Serialize;

use crate::config::{
    CALIBRATION_FACTOR_MIN_ABS, CALIBRATION_FACTOR_OFFSET, CHECKSUM_OFFSET,
    DEFAULT_CALIBRATION_FACTOR, DEFAULT_SETPOINT, DEFAULT_TIMER_THRESHOLD, LAYOUT_TAG,
    LAYOUT_TAG_OFFSET, REGION_LEN, TIMER_THRESHOLD_OFFSET, WEIGHT_LIMIT_MAX, WEIGHT_LIMIT_MIN,
    WEIGHT_SETPOINT_OFFSET,
};
use crate::error::ValidationError;

/// A fully materialised copy of the durable region.
pub type RegionImage = [u8; REGION_LEN];

/// The persisted operating parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    CalibrationFactor,
    WeightSetpoint,
    TimerThreshold,
}

impl Param {
    pub const ALL: [Self; 3] = [
        Self::CalibrationFactor,
        Self::WeightSetpoint,
        Self::TimerThreshold,
    ];

    pub const fn offset(self) -> usize {
        match self {
            Self::CalibrationFactor => CALIBRATION_FACTOR_OFFSET,
            Self::WeightSetpoint => WEIGHT_SETPOINT_OFFSET,
            Self::TimerThreshold => TIMER_THRESHOLD_OFFSET,
        }
    }

    pub const fn default_value(self) -> f32 {
        match self {
            Self::CalibrationFactor => DEFAULT_CALIBRATION_FACTOR,
            Self::WeightSetpoint => DEFAULT_SETPOINT,
            Self::TimerThreshold => DEFAULT_TIMER_THRESHOLD,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::CalibrationFactor => "calibration_factor",
            Self::WeightSetpoint => "weight_setpoint",
            Self::TimerThreshold => "timer_threshold",
        }
    }

    /// Range check in isolation (no cross-field invariant).
    pub fn check_range(self, value: f32) -> Result<(), ValidationError> {
        let ok = match self {
            Self::CalibrationFactor => value.is_finite() && value.abs() >= CALIBRATION_FACTOR_MIN_ABS,
            // `contains` is false for NaN
            Self::WeightSetpoint | Self::TimerThreshold => {
                (WEIGHT_LIMIT_MIN..=WEIGHT_LIMIT_MAX).contains(&value)
            }
        };
        if ok {
            Ok(())
        } else {
            Err(ValidationError::OutOfRange { param: self, value })
        }
    }
}

/// The persisted configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterSet {
    pub calibration_factor: f32,
    pub weight_setpoint: f32,
    pub timer_threshold: f32,
}

impl ParameterSet {
    pub const DEFAULT: Self = Self {
        calibration_factor: DEFAULT_CALIBRATION_FACTOR,
        weight_setpoint: DEFAULT_SETPOINT,
        timer_threshold: DEFAULT_TIMER_THRESHOLD,
    };

    pub const fn get(&self, param: Param) -> f32 {
        match param {
            Param::CalibrationFactor => self.calibration_factor,
            Param::WeightSetpoint => self.weight_setpoint,
            Param::TimerThreshold => self.timer_threshold,
        }
    }

    pub fn set(&mut self, param: Param, value: f32) {
        match param {
            Param::CalibrationFactor => self.calibration_factor = value,
            Param::WeightSetpoint => self.weight_setpoint = value,
            Param::TimerThreshold => self.timer_threshold = value,
        }
    }

    /// Full setter validation of `value` for `param` against this set.
    pub fn validate(&self, param: Param, value: f32) -> Result<(), ValidationError> {
        param.check_range(value)?;
        let (threshold, setpoint) = match param {
            Param::CalibrationFactor => return Ok(()),
            Param::WeightSetpoint => (self.timer_threshold, value),
            Param::TimerThreshold => (value, self.weight_setpoint),
        };
        if threshold > setpoint {
            return Err(ValidationError::ThresholdAboveSetpoint {
                threshold,
                setpoint,
            });
        }
        Ok(())
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

pub fn read_u32(region: &RegionImage, offset: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&region[offset..offset + 4]);
    u32::from_le_bytes(b)
}

pub fn read_f32(region: &RegionImage, offset: usize) -> f32 {
    f32::from_bits(read_u32(region, offset))
}

pub fn stored_checksum(region: &RegionImage) -> u32 {
    read_u32(region, CHECKSUM_OFFSET)
}

pub fn stored_tag(region: &RegionImage) -> u32 {
    read_u32(region, LAYOUT_TAG_OFFSET)
}

/// Regions written before the tag existed hold erased or zeroed bytes there.
pub const fn is_blank_tag(tag: u32) -> bool {
    tag == 0 || tag == u32::MAX
}

pub const fn is_known_tag(tag: u32) -> bool {
    tag == LAYOUT_TAG
}

/// CRC over everything except the checksum slot.
pub fn compute_checksum(region: &RegionImage) -> u32 {
    crc32_ieee(&region[..CHECKSUM_OFFSET])
}

/// Region holding `params`, the current tag and a valid checksum.
pub fn encode(params: &ParameterSet) -> RegionImage {
    let mut region = [0u8; REGION_LEN];
    for p in Param::ALL {
        let off = p.offset();
        region[off..off + 4].copy_from_slice(&params.get(p).to_le_bytes());
    }
    region[LAYOUT_TAG_OFFSET..LAYOUT_TAG_OFFSET + 4].copy_from_slice(&LAYOUT_TAG.to_le_bytes());
    seal(&mut region);
    region
}

/// Recompute and store the checksum in-place.
pub fn seal(region: &mut RegionImage) {
    let crc = compute_checksum(region);
    region[CHECKSUM_OFFSET..].copy_from_slice(&crc.to_le_bytes());
}

/// CRC-32/IEEE (reflected, poly 0xEDB88320, init/xorout 0xFFFFFFFF).
pub fn crc32_ieee(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &b in bytes {
        crc ^= b as u32;
        for _ in 0..8 {
            let mask = 0u32.wrapping_sub(crc & 1);
            crc = (crc >> 1) ^ (0xEDB8_8320u32 & mask);
        }
    }
    !crc
}
