//! Control state machine.
//!
//! Consumes one weight sample per poll and the cached [`ParameterSet`]:
//!
//! - **Relay latch**: `weight >= weight_setpoint` energises the relay.  The
//!   rule never de-energises; only [`Controller::reset_relay`] (or a manual
//!   toggle) does.  Reset while still overweight re-latches on the next poll.
//! - **Band timer**: see [`timer`].
//! - **Exceeded notification**: while over the setpoint, flagged at most
//!   once per notify interval.
//!
//! The controller holds the logical relay state; the caller applies it to
//! the [`RelayPort`](crate::app::ports::RelayPort).

pub mod timer;

use core::time::Duration;

use serde::Serialize;

use crate::config::ControllerConfig;
use crate::diagnostics::IntervalGate;
use crate::store::ParameterSet;

pub use timer::{BandTimer, TimerPhase};

/// Transient control state.  Rebuilt as `Idle`/de-energised on every boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlState {
    pub timer_phase: TimerPhase,
    pub timer_start_ms: u64,
    pub timer_stop_ms: u64,
    pub relay_energized: bool,
}

/// What one poll changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// The relay latch tripped this poll.
    pub relay_latched: bool,
    pub timer: Option<(TimerPhase, TimerPhase)>,
    /// Rate-limited "setpoint exceeded" notification is due.
    pub notify_exceeded: bool,
}

pub struct Controller {
    relay_enabled: bool,
    timer_enabled: bool,
    relay_energized: bool,
    timer: BandTimer,
    notify: IntervalGate,
    last_poll_ms: u64,
}

impl Controller {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            relay_enabled: config.relay_enabled,
            timer_enabled: config.timer_enabled,
            relay_energized: false,
            timer: BandTimer::new(),
            notify: IntervalGate::new(config.notify_interval_ms),
            last_poll_ms: 0,
        }
    }

    /// Evaluate one poll against a single weight sample.
    pub fn update(&mut self, weight: f32, now_ms: u64, params: &ParameterSet) -> PollOutcome {
        self.last_poll_ms = now_ms;
        let mut out = PollOutcome::default();
        let over = weight >= params.weight_setpoint;

        if self.relay_enabled && over && !self.relay_energized {
            self.relay_energized = true;
            out.relay_latched = true;
        }

        if over {
            out.notify_exceeded = self.notify.ready(now_ms);
        }

        if self.timer_enabled {
            out.timer = self.timer.step(
                weight,
                params.timer_threshold,
                params.weight_setpoint,
                now_ms,
            );
        }
        out
    }

    // ── Relay ─────────────────────────────────────────────────────

    /// Clear the latch.  Returns `true` if the relay was energised.
    pub fn reset_relay(&mut self) -> bool {
        core::mem::replace(&mut self.relay_energized, false)
    }

    /// Manual override.  Returns the new state.
    pub fn toggle_relay(&mut self) -> bool {
        self.relay_energized = !self.relay_energized;
        self.relay_energized
    }

    pub fn relay_energized(&self) -> bool {
        self.relay_energized
    }

    // ── Timer ─────────────────────────────────────────────────────

    pub fn timer_phase(&self) -> TimerPhase {
        self.timer.phase()
    }

    /// Elapsed time as of the most recent poll.
    pub fn elapsed(&self) -> Duration {
        self.timer.elapsed(self.last_poll_ms)
    }

    pub fn elapsed_at(&self, now_ms: u64) -> Duration {
        self.timer.elapsed(now_ms)
    }

    pub fn state(&self) -> ControlState {
        ControlState {
            timer_phase: self.timer.phase(),
            timer_start_ms: self.timer.start_ms(),
            timer_stop_ms: self.timer.stop_ms(),
            relay_energized: self.relay_energized,
        }
    }
}
