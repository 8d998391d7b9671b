//! Mock hardware adapter for integration tests.
//!
//! Plays back a scripted weight sequence (one sample per `refresh`) and
//! records every relay call so tests can assert on the full command
//! history without touching real GPIO.

use std::collections::VecDeque;

use smartscale::adapters::nvs::NvsRegion;
use smartscale::app::events::AppEvent;
use smartscale::app::ports::{EventSink, NoIrqGate, RelayPort, SamplePort};
use smartscale::app::service::ScaleService;
use smartscale::config::ControllerConfig;
use smartscale::sensors::load_cell::WeightSample;
use smartscale::store::ParameterStore;

// ── Relay call record ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCall {
    Energize,
    DeEnergize,
}

// ── MockScale ─────────────────────────────────────────────────

pub struct MockScale {
    script: VecDeque<f32>,
    sample: WeightSample,
    pub calibration_factor: f32,
    /// Refreshes still needed before a requested tare finishes.
    tare_remaining: u32,
    pub tare_requests: u32,
    pub energized: bool,
    pub relay_calls: Vec<RelayCall>,
}

#[allow(dead_code)]
impl MockScale {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            sample: WeightSample::default(),
            calibration_factor: 0.0,
            tare_remaining: 0,
            tare_requests: 0,
            energized: false,
            relay_calls: Vec::new(),
        }
    }

    pub fn with_weights(weights: &[f32]) -> Self {
        let mut m = Self::new();
        m.push_weights(weights);
        m
    }

    pub fn push_weights(&mut self, weights: &[f32]) {
        self.script.extend(weights.iter().copied());
    }

    pub fn energize_count(&self) -> usize {
        self.relay_calls
            .iter()
            .filter(|c| **c == RelayCall::Energize)
            .count()
    }
}

impl Default for MockScale {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplePort for MockScale {
    fn refresh(&mut self, now_ms: u64) -> bool {
        if self.tare_remaining > 0 {
            self.tare_remaining -= 1;
        }
        match self.script.pop_front() {
            Some(weight) => {
                self.sample = WeightSample {
                    weight,
                    updated_ms: now_ms,
                    seq: self.sample.seq + 1,
                };
                true
            }
            None => false,
        }
    }

    fn read_latest_sample(&self) -> WeightSample {
        self.sample
    }

    fn request_tare(&mut self) {
        self.tare_requests += 1;
        self.tare_remaining = 3;
    }

    fn tare_in_progress(&self) -> bool {
        self.tare_remaining > 0
    }

    fn set_calibration_factor(&mut self, factor: f32) {
        self.calibration_factor = factor;
    }

    /// Pretends the cell currently reads 2.0 at the active factor.
    fn calibration_for_known_mass(&self, mass: f32) -> Option<f32> {
        if mass > 0.0 && mass.is_finite() {
            Some(self.calibration_factor * 2.0 / mass)
        } else {
            None
        }
    }
}

impl RelayPort for MockScale {
    fn energize(&mut self) {
        self.energized = true;
        self.relay_calls.push(RelayCall::Energize);
    }

    fn de_energize(&mut self) {
        self.energized = false;
        self.relay_calls.push(RelayCall::DeEnergize);
    }

    fn is_energized(&self) -> bool {
        self.energized
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Fixtures ──────────────────────────────────────────────────

pub type TestService = ScaleService<NvsRegion, NoIrqGate>;

/// Service over `region`, booted.
#[allow(dead_code)]
pub fn boot_service(
    region: NvsRegion,
    config: &ControllerConfig,
    hw: &mut MockScale,
    sink: &mut RecordingSink,
) -> TestService {
    let mut svc = ScaleService::new(ParameterStore::new(region, NoIrqGate), config);
    svc.boot(hw, sink).expect("boot");
    svc
}

/// Fresh erased region, default config.
#[allow(dead_code)]
pub fn make_app(weights: &[f32]) -> (TestService, MockScale, RecordingSink) {
    let mut hw = MockScale::with_weights(weights);
    let mut sink = RecordingSink::new();
    let svc = boot_service(
        NvsRegion::new(),
        &ControllerConfig::default(),
        &mut hw,
        &mut sink,
    );
    (svc, hw, sink)
}
