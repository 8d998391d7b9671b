//! Application service, the hexagonal core.
//!
//! [`ScaleService`] owns the [`ParameterStore`] and the [`Controller`].  It
//! exposes the operations the HTTP routes and the console call, and runs
//! one control cycle per [`poll`](ScaleService::poll).  All I/O flows
//! through port traits injected at call sites.
//!
//! ```text
//!  SamplePort ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                 │      ScaleService      │
//!   RelayPort ◀── │  Store · Controller    │ ◀── RegionPort
//!                 └────────────────────────┘
//! ```

use core::time::Duration;

use log::info;
use serde::Serialize;

use crate::config::ControllerConfig;
use crate::control::{Controller, PollOutcome, TimerPhase};
use crate::diagnostics::IntervalGate;
use crate::error::{Result, ValidationError};
use crate::store::{BootReport, Param, ParameterSet, ParameterStore, RegionImage};

use super::commands::AppCommand;
use super::events::{AppEvent, RelayCause};
use super::ports::{EventSink, IrqGate, RegionPort, RelayPort, SamplePort};

/// Point-in-time view for the status route and other readers outside the
/// poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub weight: f32,
    pub params: ParameterSet,
    pub relay_energized: bool,
    pub timer_phase: TimerPhase,
    pub elapsed_ms: u64,
    pub tare_in_progress: bool,
    pub sample_seq: u32,
    pub report_enabled: bool,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            weight: 0.0,
            params: ParameterSet::DEFAULT,
            relay_energized: false,
            timer_phase: TimerPhase::Idle,
            elapsed_ms: 0,
            tare_in_progress: false,
            sample_seq: 0,
            report_enabled: true,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ScaleService
// ───────────────────────────────────────────────────────────────

pub struct ScaleService<R: RegionPort, G: IrqGate> {
    store: ParameterStore<R, G>,
    controller: Controller,
    report_gate: IntervalGate,
    report_enabled: bool,
    tare_pending: bool,
    weight: f32,
    sample_seq: u32,
    poll_count: u64,
}

impl<R: RegionPort, G: IrqGate> ScaleService<R, G> {
    /// Does **not** touch storage; call [`boot`](Self::boot) next.
    pub fn new(store: ParameterStore<R, G>, config: &ControllerConfig) -> Self {
        Self {
            store,
            controller: Controller::new(config),
            report_gate: IntervalGate::new(config.report_interval_ms),
            report_enabled: true,
            tare_pending: false,
            weight: 0.0,
            sample_seq: 0,
            poll_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Validate and load persisted parameters, then push the calibration
    /// factor to the load cell.  Integrity repairs are emitted as events.
    pub fn boot(
        &mut self,
        hw: &mut impl SamplePort,
        sink: &mut impl EventSink,
    ) -> Result<BootReport> {
        let report = self.store.initialize()?;
        for e in &report.recovered {
            sink.emit(&AppEvent::IntegrityRecovered(*e));
        }

        let params = self.store.snapshot();
        hw.set_calibration_factor(params.calibration_factor);
        sink.emit(&AppEvent::Started(params));
        info!(
            "ScaleService started (setpoint={} threshold={} cal={})",
            params.weight_setpoint, params.timer_threshold, params.calibration_factor
        );
        Ok(report)
    }

    // ── Per-poll orchestration ────────────────────────────────

    /// One control cycle: refresh sample → controller → relay → diagnostics.
    ///
    /// The `hw` parameter satisfies **both** [`SamplePort`] and
    /// [`RelayPort`], avoiding a double mutable borrow.
    pub fn poll(
        &mut self,
        now_ms: u64,
        hw: &mut (impl SamplePort + RelayPort),
        sink: &mut impl EventSink,
    ) -> PollOutcome {
        self.poll_count += 1;

        hw.refresh(now_ms);
        let sample = hw.read_latest_sample();
        self.weight = sample.weight;
        self.sample_seq = sample.seq;

        if self.tare_pending && !hw.tare_in_progress() {
            self.tare_pending = false;
            sink.emit(&AppEvent::TareComplete);
        }

        let params = self.store.snapshot();
        let out = self.controller.update(self.weight, now_ms, &params);

        if out.relay_latched {
            hw.energize();
            sink.emit(&AppEvent::RelayChanged {
                energized: true,
                cause: RelayCause::Latched,
            });
        }

        if out.notify_exceeded {
            sink.emit(&AppEvent::SetpointExceeded {
                weight: self.weight,
                setpoint: params.weight_setpoint,
            });
        }

        if let Some((from, to)) = out.timer {
            sink.emit(&AppEvent::TimerChanged {
                from,
                to,
                elapsed: self.controller.elapsed(),
            });
        }

        if self.report_enabled && self.report_gate.ready(now_ms) {
            sink.emit(&AppEvent::WeightReport {
                weight: self.weight,
            });
        }

        out
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply an external command (HTTP route or console line).
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        hw: &mut (impl SamplePort + RelayPort),
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match cmd {
            AppCommand::Tare => {
                hw.request_tare();
                self.tare_pending = true;
                sink.emit(&AppEvent::TareStarted);
            }
            AppCommand::SetSetpoint(v) => self.set_setpoint(v, sink)?,
            AppCommand::SetCalibrationFactor(v) => self.set_calibration_factor(v, hw, sink)?,
            AppCommand::SetTimerThreshold(v) => self.set_timer_threshold(v, sink)?,
            AppCommand::CalibrateKnownMass(mass) => {
                let factor = hw
                    .calibration_for_known_mass(mass)
                    .ok_or(ValidationError::InvalidReferenceMass(mass))?;
                self.set_calibration_factor(factor, hw, sink)?;
                info!("calibrated with {} kg: factor={}", mass, factor);
            }
            AppCommand::ResetRelay => self.reset_relay(hw, sink),
            AppCommand::ToggleRelay => {
                self.toggle_relay(hw, sink);
            }
            AppCommand::ToggleWeightReport => {
                self.report_enabled = !self.report_enabled;
                self.report_gate.reset();
                info!(
                    "weight report {}",
                    if self.report_enabled { "on" } else { "off" }
                );
            }
        }
        Ok(())
    }

    // ── Weight ────────────────────────────────────────────────

    /// Weight as of the last poll.
    pub fn get_weight(&self) -> f32 {
        self.weight
    }

    // ── Parameters ────────────────────────────────────────────

    pub fn get_setpoint(&self) -> f32 {
        self.store.get_parameter(Param::WeightSetpoint)
    }

    pub fn set_setpoint(&mut self, value: f32, sink: &mut impl EventSink) -> Result<()> {
        self.write_param(Param::WeightSetpoint, value, sink)
    }

    pub fn get_timer_threshold(&self) -> f32 {
        self.store.get_parameter(Param::TimerThreshold)
    }

    pub fn set_timer_threshold(&mut self, value: f32, sink: &mut impl EventSink) -> Result<()> {
        self.write_param(Param::TimerThreshold, value, sink)
    }

    pub fn get_calibration_factor(&self) -> f32 {
        self.store.get_parameter(Param::CalibrationFactor)
    }

    /// Persist, then apply to the load cell.
    pub fn set_calibration_factor(
        &mut self,
        value: f32,
        hw: &mut impl SamplePort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        self.write_param(Param::CalibrationFactor, value, sink)?;
        hw.set_calibration_factor(value);
        Ok(())
    }

    fn write_param(&mut self, param: Param, value: f32, sink: &mut impl EventSink) -> Result<()> {
        let before = self.store.get_parameter(param);
        self.store.set_parameter(param, value)?;
        if before != value {
            sink.emit(&AppEvent::ParameterChanged { param, value });
        }
        Ok(())
    }

    // ── Relay ─────────────────────────────────────────────────

    pub fn get_relay_state(&self) -> bool {
        self.controller.relay_energized()
    }

    /// Clear the latch.  If the weight is still at or above the setpoint
    /// the next poll latches it again.
    pub fn reset_relay(&mut self, hw: &mut impl RelayPort, sink: &mut impl EventSink) {
        let was_on = self.controller.reset_relay();
        hw.de_energize();
        if was_on {
            sink.emit(&AppEvent::RelayChanged {
                energized: false,
                cause: RelayCause::Reset,
            });
        }
    }

    /// Manual override.  Returns the new state.
    pub fn toggle_relay(&mut self, hw: &mut impl RelayPort, sink: &mut impl EventSink) -> bool {
        let on = self.controller.toggle_relay();
        if on {
            hw.energize();
        } else {
            hw.de_energize();
        }
        sink.emit(&AppEvent::RelayChanged {
            energized: on,
            cause: RelayCause::Toggled,
        });
        on
    }

    // ── Queries ───────────────────────────────────────────────

    /// Elapsed timer value as of the last poll.
    pub fn get_elapsed_time(&self) -> Duration {
        self.controller.elapsed()
    }

    pub fn timer_phase(&self) -> TimerPhase {
        self.controller.timer_phase()
    }

    pub fn tare_in_progress(&self) -> bool {
        self.tare_pending
    }

    pub fn report_enabled(&self) -> bool {
        self.report_enabled
    }

    pub fn poll_count(&self) -> u64 {
        self.poll_count
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            weight: self.weight,
            params: self.store.snapshot(),
            relay_energized: self.controller.relay_energized(),
            timer_phase: self.controller.timer_phase(),
            elapsed_ms: self.controller.elapsed().as_millis() as u64,
            tare_in_progress: self.tare_pending,
            sample_seq: self.sample_seq,
            report_enabled: self.report_enabled,
        }
    }

    /// Raw region bytes for the console dump.
    pub fn dump_region(&self) -> Result<RegionImage> {
        Ok(self.store.dump()?)
    }

    pub fn store(&self) -> &ParameterStore<R, G> {
        &self.store
    }
}
