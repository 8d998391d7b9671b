//! Rate limiting and region dumps for the diagnostics channel.
//!
//! Nothing here gates a control decision.  [`IntervalGate`] keeps the
//! "setpoint exceeded" notification and the weight report from flooding
//! the serial log; [`hex_dump`] backs the console `d` command.

use core::fmt::Write;

/// At most one pass per `interval_ms`, independent of how often it's asked.
#[derive(Debug, Clone, Copy)]
pub struct IntervalGate {
    interval_ms: u64,
    last_ms: Option<u64>,
}

impl IntervalGate {
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms: interval_ms as u64,
            last_ms: None,
        }
    }

    /// `true` on the first call and whenever `interval_ms` has passed since
    /// the last `true`.
    pub fn ready(&mut self, now_ms: u64) -> bool {
        match self.last_ms {
            Some(last) if now_ms.saturating_sub(last) < self.interval_ms => false,
            _ => {
                self.last_ms = Some(now_ms);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

/// Bytes per dump line.
pub const DUMP_LINE_BYTES: usize = 16;

/// One dump line: `"%03X: "` address prefix then 16 `"%02X "` bytes.
pub type DumpLine = heapless::String<64>;

/// Render `bytes` as hex lines of [`DUMP_LINE_BYTES`] each.
pub fn hex_dump(bytes: &[u8]) -> impl Iterator<Item = DumpLine> + '_ {
    bytes
        .chunks(DUMP_LINE_BYTES)
        .enumerate()
        .map(|(i, chunk)| {
            let mut line = DumpLine::new();
            // 5 + 16 * 3 = 53 chars, always fits
            let _ = write!(line, "{:03X}: ", i * DUMP_LINE_BYTES);
            for b in chunk {
                let _ = write!(line, "{:02X} ", b);
            }
            line
        })
}
