//! Load-cell sampling: smoothing, tare and calibration.
//!
//! The data-ready ISR only raises [`DataReadyFlag`]; [`LoadCell::service`]
//! runs from the poll loop, consumes the flag and does the read and the
//! float maths there.
//!
//! ```text
//!   weight = (mean(last 8 raw) - tare_offset) / calibration_factor
//! ```

use embedded_hal::delay::DelayNs;
use log::{info, warn};
use serde::Serialize;

use super::RawAdc;
use crate::app::ports::Clock;
use crate::config::{CALIBRATION_FACTOR_MIN_ABS, DEFAULT_CALIBRATION_FACTOR, SMOOTHING_SAMPLES};
use crate::error::SamplingError;
use crate::events::DataReadyFlag;

/// Boot polling granularity while waiting for conversions.
const START_POLL_MS: u32 = 1;

/// The latest smoothed reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WeightSample {
    /// Calibrated weight (kg).
    pub weight: f32,
    /// Clock time of the conversion that produced it (ms since boot).
    pub updated_ms: u64,
    /// Increments with every accepted conversion.
    pub seq: u32,
}

#[derive(Debug, Clone, Copy)]
struct TareAccumulator {
    sum: i64,
    count: usize,
}

pub struct LoadCell<A: RawAdc> {
    adc: A,
    signal: Option<&'static DataReadyFlag>,

    ring: [i32; SMOOTHING_SAMPLES],
    head: usize,
    count: usize,

    calibration_factor: f32,
    tare_offset: i32,
    tare: Option<TareAccumulator>,

    sample: WeightSample,
    dropouts: u32,
    missed_edges: u32,
}

impl<A: RawAdc> LoadCell<A> {
    /// Without a data-ready signal the ADC is polled on every service call.
    pub fn new(adc: A) -> Self {
        Self {
            adc,
            signal: None,
            ring: [0; SMOOTHING_SAMPLES],
            head: 0,
            count: 0,
            calibration_factor: DEFAULT_CALIBRATION_FACTOR,
            tare_offset: 0,
            tare: None,
            sample: WeightSample::default(),
            dropouts: 0,
            missed_edges: 0,
        }
    }

    /// Use `flag`, raised by the data-ready ISR, as the primary trigger.
    ///
    /// DOUT is still checked when the flag is clear: the HX711 keeps DOUT
    /// low until the pending conversion is clocked out, so an edge lost
    /// while the interrupt was masked never repeats.
    pub fn with_data_ready(mut self, flag: &'static DataReadyFlag) -> Self {
        self.signal = Some(flag);
        self
    }

    // ── Boot ──────────────────────────────────────────────────────

    /// Wait for the cell to settle, then optionally tare.
    ///
    /// Fails with [`SamplingError::Timeout`] when no conversion arrives
    /// within `timeout_ms`, and [`SamplingError::TareTimeout`] when the
    /// tare cannot finish in that window.
    pub fn start(
        &mut self,
        clock: &impl Clock,
        delay: &mut impl DelayNs,
        stabilize_ms: u32,
        timeout_ms: u32,
        tare: bool,
    ) -> Result<(), SamplingError> {
        let t0 = clock.now_ms();
        let stabilize = u64::from(stabilize_ms);
        let timeout = u64::from(timeout_ms);

        let mut seen = false;
        loop {
            let now = clock.now_ms();
            if self.adc.is_ready() {
                let raw = self.adc.read_raw()?;
                self.ingest(raw, now);
                seen = true;
            }
            let elapsed = now.saturating_sub(t0);
            if seen && elapsed >= stabilize {
                break;
            }
            if elapsed >= timeout {
                warn!("LoadCell: no conversion within {} ms", timeout_ms);
                return Err(SamplingError::Timeout);
            }
            delay.delay_ms(START_POLL_MS);
        }

        if tare {
            self.request_tare();
            while self.tare.is_some() {
                let now = clock.now_ms();
                if now.saturating_sub(t0) >= timeout {
                    self.tare = None;
                    warn!("LoadCell: tare incomplete after {} ms", timeout_ms);
                    return Err(SamplingError::TareTimeout);
                }
                if self.adc.is_ready() {
                    let raw = self.adc.read_raw()?;
                    self.ingest(raw, now);
                } else {
                    delay.delay_ms(START_POLL_MS);
                }
            }
        }

        // Boot reads bypassed the flag; drop anything it latched meanwhile.
        if let Some(flag) = self.signal {
            flag.take();
        }
        info!(
            "LoadCell: started (offset={}, factor={})",
            self.tare_offset, self.calibration_factor
        );
        Ok(())
    }

    // ── Poll ──────────────────────────────────────────────────────

    /// Fold in a pending conversion, if any.  Returns `Ok(true)` when the
    /// sample changed.  On error the previous sample stays current.
    pub fn service(&mut self, now_ms: u64) -> Result<bool, SamplingError> {
        let signalled = self.signal.map(DataReadyFlag::take);
        if !self.adc.is_ready() {
            return Ok(false);
        }
        if signalled == Some(false) {
            self.missed_edges = self.missed_edges.saturating_add(1);
        }
        match self.adc.read_raw() {
            Ok(raw) => {
                self.ingest(raw, now_ms);
                Ok(true)
            }
            Err(e) => {
                self.dropouts = self.dropouts.saturating_add(1);
                Err(e)
            }
        }
    }

    fn ingest(&mut self, raw: i32, now_ms: u64) {
        self.ring[self.head] = raw;
        self.head = (self.head + 1) % SMOOTHING_SAMPLES;
        self.count = (self.count + 1).min(SMOOTHING_SAMPLES);

        if let Some(acc) = self.tare.as_mut() {
            acc.sum += i64::from(raw);
            acc.count += 1;
            if acc.count >= SMOOTHING_SAMPLES {
                self.tare_offset = (acc.sum / acc.count as i64) as i32;
                self.tare = None;
                info!("LoadCell: tare complete, offset={}", self.tare_offset);
            }
        }

        self.sample = WeightSample {
            weight: self.net_raw() / self.calibration_factor,
            updated_ms: now_ms,
            seq: self.sample.seq.wrapping_add(1),
        };
    }

    /// Smoothed raw reading minus the tare offset.
    fn net_raw(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        let sum: i64 = self.ring[..self.count].iter().map(|&r| i64::from(r)).sum();
        let mean = sum as f64 / self.count as f64;
        (mean - f64::from(self.tare_offset)) as f32
    }

    // ── Accessors / commands ──────────────────────────────────────

    pub fn sample(&self) -> WeightSample {
        self.sample
    }

    /// Average the next [`SMOOTHING_SAMPLES`] conversions into the offset.
    pub fn request_tare(&mut self) {
        self.tare = Some(TareAccumulator { sum: 0, count: 0 });
    }

    pub fn tare_in_progress(&self) -> bool {
        self.tare.is_some()
    }

    pub fn tare_offset(&self) -> i32 {
        self.tare_offset
    }

    /// Factors too close to zero are ignored.
    pub fn set_calibration_factor(&mut self, factor: f32) {
        if !factor.is_finite() || factor.abs() < CALIBRATION_FACTOR_MIN_ABS {
            warn!("LoadCell: ignoring calibration factor {}", factor);
            return;
        }
        self.calibration_factor = factor;
    }

    pub fn calibration_factor(&self) -> f32 {
        self.calibration_factor
    }

    /// Factor that makes the current net reading equal `mass`.
    pub fn calibration_for_known_mass(&self, mass: f32) -> Option<f32> {
        if !mass.is_finite() || mass <= 0.0 {
            return None;
        }
        let factor = self.net_raw() / mass;
        (factor.is_finite() && factor.abs() >= CALIBRATION_FACTOR_MIN_ABS).then_some(factor)
    }

    pub fn dropouts(&self) -> u32 {
        self.dropouts
    }

    /// Conversions found ready on DOUT without a data-ready edge.
    pub fn missed_edges(&self) -> u32 {
        self.missed_edges
    }

    pub fn adc_mut(&mut self) -> &mut A {
        &mut self.adc
    }
}
