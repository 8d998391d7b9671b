//! Elapsed-time timer armed by the threshold/setpoint weight band.
//!
//! ```text
//!            w >= threshold           w >= setpoint
//!   ┌──────┐ ───────────────▶ ┌─────────┐ ───────────▶ ┌─────────┐
//!   │ Idle │                  │ Running │              │ Stopped │
//!   └──────┘ ◀─────────────────────────────────────────└─────────┘
//!                          w <= threshold
//! ```
//!
//! One weight value per step and at most one transition per step: a step
//! that stops the timer cannot also return it to `Idle`.

use core::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimerPhase {
    Idle,
    Running,
    Stopped,
}

impl TimerPhase {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BandTimer {
    phase: TimerPhase,
    start_ms: u64,
    stop_ms: u64,
}

impl BandTimer {
    pub const fn new() -> Self {
        Self {
            phase: TimerPhase::Idle,
            start_ms: 0,
            stop_ms: 0,
        }
    }

    pub const fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub const fn start_ms(&self) -> u64 {
        self.start_ms
    }

    pub const fn stop_ms(&self) -> u64 {
        self.stop_ms
    }

    /// Advance with one weight sample.  Returns the transition taken, if any.
    pub fn step(
        &mut self,
        weight: f32,
        threshold: f32,
        setpoint: f32,
        now_ms: u64,
    ) -> Option<(TimerPhase, TimerPhase)> {
        let from = self.phase;
        let to = match from {
            TimerPhase::Idle if weight >= threshold => {
                self.start_ms = now_ms;
                TimerPhase::Running
            }
            TimerPhase::Running if weight >= setpoint => {
                self.stop_ms = now_ms;
                TimerPhase::Stopped
            }
            TimerPhase::Stopped if weight <= threshold => TimerPhase::Idle,
            _ => return None,
        };
        self.phase = to;
        Some((from, to))
    }

    /// Zero while idle, live while running, frozen once stopped.
    pub fn elapsed(&self, now_ms: u64) -> Duration {
        let ms = match self.phase {
            TimerPhase::Idle => 0,
            TimerPhase::Running => now_ms.saturating_sub(self.start_ms),
            TimerPhase::Stopped => self.stop_ms.saturating_sub(self.start_ms),
        };
        Duration::from_millis(ms)
    }
}

impl Default for BandTimer {
    fn default() -> Self {
        Self::new()
    }
}
