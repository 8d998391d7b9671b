//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).  One tagged line per
//! event.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(p) => {
                info!(
                    "START | setpoint={:.2}kg threshold={:.2}kg cal={:.3}",
                    p.weight_setpoint, p.timer_threshold, p.calibration_factor
                );
            }
            AppEvent::IntegrityRecovered(e) => {
                warn!("STORE | recovered: {}", e);
            }
            AppEvent::ParameterChanged { param, value } => {
                info!("PARAM | {} = {}", param.name(), value);
            }
            AppEvent::SetpointExceeded { weight, setpoint } => {
                info!("LIMIT | {:.2}kg >= setpoint {:.2}kg", weight, setpoint);
            }
            AppEvent::RelayChanged { energized, cause } => {
                info!(
                    "RELAY | {} ({:?})",
                    if *energized { "ON" } else { "OFF" },
                    cause
                );
            }
            AppEvent::TimerChanged { from, to, elapsed } => {
                info!(
                    "TIMER | {} -> {} | elapsed={}ms",
                    from.name(),
                    to.name(),
                    elapsed.as_millis()
                );
            }
            AppEvent::WeightReport { weight } => {
                info!("WEIGHT | {:.2}kg", weight);
            }
            AppEvent::TareStarted => info!("TARE | started"),
            AppEvent::TareComplete => info!("TARE | done"),
        }
    }
}
