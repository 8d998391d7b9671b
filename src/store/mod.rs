//! Persistent parameter store.
//!
//! Owns the durable region and an in-memory cache of the three operating
//! parameters.  Every durable mutation runs with the sampling interrupt
//! masked and ends with a commit; the trailing CRC is recomputed once per
//! write sequence, after all fields have been written.
//!
//! Boot recovery, in order:
//!
//! 1. CRC mismatch → full reset to defaults.
//! 2. Unknown layout tag → full reset.  A blank tag (legacy region) is
//!    stamped in place and the values kept.
//! 3. A field that is NaN or fails range validation → that field alone is
//!    reset.
//! 4. `timer_threshold > weight_setpoint` → the threshold is reset.

pub mod layout;

use heapless::Vec;
use log::{info, warn};

use crate::app::ports::{IrqGate, RegionPort, StorageError};
use crate::config::{CHECKSUM_OFFSET, LAYOUT_TAG, LAYOUT_TAG_OFFSET, REGION_LEN};
use crate::error::{IntegrityError, Result};

pub use layout::{Param, ParameterSet, RegionImage};

/// Integrity problems found and repaired by [`ParameterStore::initialize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BootReport {
    pub recovered: Vec<IntegrityError, 4>,
    /// A blank layout tag was stamped onto an otherwise valid region.
    pub tag_stamped: bool,
}

impl BootReport {
    pub fn is_clean(&self) -> bool {
        self.recovered.is_empty() && !self.tag_stamped
    }

    fn push(&mut self, e: IntegrityError) {
        warn!("store: {e}, repairing");
        // Worst case is three field repairs; a full reset returns early.
        let _ = self.recovered.push(e);
    }
}

pub struct ParameterStore<R: RegionPort, G: IrqGate> {
    region: R,
    gate: G,
    cache: ParameterSet,
    durable_writes: u32,
    checksum_updates: u32,
}

impl<R: RegionPort, G: IrqGate> ParameterStore<R, G> {
    /// The cache holds defaults until [`initialize`](Self::initialize) runs.
    pub fn new(region: R, gate: G) -> Self {
        Self {
            region,
            gate,
            cache: ParameterSet::DEFAULT,
            durable_writes: 0,
            checksum_updates: 0,
        }
    }

    // ── Boot ──────────────────────────────────────────────────────

    /// Validate the durable region and load the cache, repairing as needed.
    ///
    /// Only storage failures are returned; integrity problems are fixed in
    /// place and listed in the report.  Running this on an already valid
    /// region performs no writes.
    pub fn initialize(&mut self) -> core::result::Result<BootReport, StorageError> {
        if self.region.len() < REGION_LEN {
            return Err(StorageError::OutOfBounds);
        }

        let mut image: RegionImage = [0u8; REGION_LEN];
        self.region.read(0, &mut image)?;
        let mut report = BootReport::default();

        let stored = layout::stored_checksum(&image);
        let computed = layout::compute_checksum(&image);
        if stored != computed {
            report.push(IntegrityError::ChecksumMismatch { stored, computed });
            self.reset_all()?;
            return Ok(report);
        }

        let tag = layout::stored_tag(&image);
        let mut dirty = false;
        if !layout::is_known_tag(tag) {
            if !layout::is_blank_tag(tag) {
                report.push(IntegrityError::LayoutMismatch { tag });
                self.reset_all()?;
                return Ok(report);
            }
            info!("store: legacy region, stamping layout tag");
            self.write_field(LAYOUT_TAG_OFFSET, LAYOUT_TAG.to_le_bytes())?;
            report.tag_stamped = true;
            dirty = true;
        }

        let mut params = ParameterSet::DEFAULT;
        for p in Param::ALL {
            let v = layout::read_f32(&image, p.offset());
            if p.check_range(v).is_ok() {
                params.set(p, v);
            } else {
                report.push(IntegrityError::FieldCorrupt(p));
                self.write_field(p.offset(), p.default_value().to_le_bytes())?;
                dirty = true;
            }
        }

        if params.timer_threshold > params.weight_setpoint {
            report.push(IntegrityError::FieldCorrupt(Param::TimerThreshold));
            params.timer_threshold = Param::TimerThreshold.default_value();
            self.write_field(
                Param::TimerThreshold.offset(),
                params.timer_threshold.to_le_bytes(),
            )?;
            dirty = true;
        }

        if dirty {
            self.update_checksum()?;
        }
        self.cache = params;

        info!(
            "store: loaded cal={} setpoint={} threshold={}",
            params.calibration_factor, params.weight_setpoint, params.timer_threshold
        );
        Ok(report)
    }

    /// Rewrite every field with its default, then seal once.
    fn reset_all(&mut self) -> core::result::Result<(), StorageError> {
        let defaults = ParameterSet::DEFAULT;
        self.masked(|r| {
            for p in Param::ALL {
                r.write(p.offset(), &defaults.get(p).to_le_bytes())?;
            }
            r.write(LAYOUT_TAG_OFFSET, &LAYOUT_TAG.to_le_bytes())?;
            r.commit()
        })?;
        self.durable_writes += 1;
        self.update_checksum()?;
        self.cache = defaults;
        info!("store: region reset to defaults");
        Ok(())
    }

    // ── Parameters ────────────────────────────────────────────────

    /// Cached value; never touches durable storage.
    pub fn get_parameter(&self, param: Param) -> f32 {
        self.cache.get(param)
    }

    pub fn snapshot(&self) -> ParameterSet {
        self.cache
    }

    /// Validate, write through, update the cache, reseal.
    ///
    /// Writing the value already cached is a no-op.
    pub fn set_parameter(&mut self, param: Param, value: f32) -> Result<()> {
        self.cache.validate(param, value)?;
        if self.cache.get(param) == value {
            return Ok(());
        }

        self.write_field(param.offset(), value.to_le_bytes())?;
        self.cache.set(param, value);
        self.update_checksum()?;
        info!("store: {} = {}", param.name(), value);
        Ok(())
    }

    // ── Durable writes ────────────────────────────────────────────

    fn write_field(
        &mut self,
        offset: usize,
        bytes: [u8; 4],
    ) -> core::result::Result<(), StorageError> {
        self.masked(|r| stage_and_commit(r, offset, bytes))?;
        self.durable_writes += 1;
        Ok(())
    }

    /// CRC the region as it now stands in storage and store the result.
    fn update_checksum(&mut self) -> core::result::Result<(), StorageError> {
        let mut body = [0u8; CHECKSUM_OFFSET];
        self.masked(|r| {
            r.read(0, &mut body)?;
            let crc = layout::crc32_ieee(&body);
            stage_and_commit(r, CHECKSUM_OFFSET, crc.to_le_bytes())
        })?;
        self.checksum_updates += 1;
        Ok(())
    }

    /// Run `f` with the sampling interrupt masked.  The mask is lifted on
    /// every path, including errors.
    fn masked<T>(
        &mut self,
        f: impl FnOnce(&mut R) -> core::result::Result<T, StorageError>,
    ) -> core::result::Result<T, StorageError> {
        self.gate.disable_sampling_irq();
        let result = f(&mut self.region);
        self.gate.enable_sampling_irq();
        result
    }

    // ── Diagnostics ───────────────────────────────────────────────

    /// Raw copy of the region, checksum slot included.
    pub fn dump(&self) -> core::result::Result<RegionImage, StorageError> {
        let mut image = [0u8; REGION_LEN];
        self.region.read(0, &mut image)?;
        Ok(image)
    }

    /// Number of committed field/reset write sequences.
    pub fn durable_writes(&self) -> u32 {
        self.durable_writes
    }

    /// Number of checksum recomputations.
    pub fn checksum_updates(&self) -> u32 {
        self.checksum_updates
    }

    pub fn region(&self) -> &R {
        &self.region
    }

    pub fn region_mut(&mut self) -> &mut R {
        &mut self.region
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }
}

/// Write four bytes and commit.  A failed commit unstages the bytes again,
/// so a later commit of an unrelated field cannot persist them.
fn stage_and_commit<R: RegionPort>(
    region: &mut R,
    offset: usize,
    bytes: [u8; 4],
) -> core::result::Result<(), StorageError> {
    let mut previous = [0u8; 4];
    region.read(offset, &mut previous)?;
    region.write(offset, &bytes)?;
    if let Err(e) = region.commit() {
        warn!("store: commit at offset {offset} failed, unstaging");
        region.write(offset, &previous)?;
        return Err(e);
    }
    Ok(())
}
