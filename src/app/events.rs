//! Outbound application events.
//!
//! The [`ScaleService`](super::service::ScaleService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use core::time::Duration;

use crate::control::TimerPhase;
use crate::error::IntegrityError;
use crate::store::{Param, ParameterSet};

/// Why the relay changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCause {
    /// Weight reached the setpoint.
    Latched,
    /// Explicit reset.
    Reset,
    /// Manual toggle.
    Toggled,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has booted with these parameters.
    Started(ParameterSet),

    /// A boot integrity problem was found and repaired.
    IntegrityRecovered(IntegrityError),

    /// A parameter was written through to durable storage.
    ParameterChanged { param: Param, value: f32 },

    /// Weight at or above the setpoint (rate-limited).
    SetpointExceeded { weight: f32, setpoint: f32 },

    RelayChanged { energized: bool, cause: RelayCause },

    TimerChanged {
        from: TimerPhase,
        to: TimerPhase,
        elapsed: Duration,
    },

    /// Periodic weight report.
    WeightReport { weight: f32 },

    TareStarted,
    TareComplete,
}
