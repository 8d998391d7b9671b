//! Serial console command parser.
//!
//! One command per line: a single letter, optionally followed by a number.
//! Parsing is pure; the binary reads stdin on its own thread and forwards
//! the parsed [`AppCommand`]s to the poll loop.

use core::fmt;

use crate::app::commands::AppCommand;

pub const HELP: &[&str] = &[
    "Available commands:",
    "h          - this help",
    "p          - enable/disable weight output",
    "t          - tare",
    "r <mass>   - calibrate with a known mass (kg)",
    "c <factor> - set calibration factor",
    "d          - dump parameter region",
    "w <kg>     - set weight setpoint",
    "s <kg>     - set timer threshold",
    "x          - reset relay",
    "g          - toggle relay",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleCommand {
    Help,
    Dump,
    App(AppCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError {
    Empty,
    Unknown(char),
    MissingArgument(char),
    BadNumber(char),
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::Unknown(c) => write!(f, "unknown command '{}', send 'h' for help", c),
            Self::MissingArgument(c) => write!(f, "'{}' needs a number", c),
            Self::BadNumber(c) => write!(f, "'{}': not a number", c),
        }
    }
}

pub fn parse(line: &str) -> Result<ConsoleCommand, ConsoleError> {
    let line = line.trim();
    let mut chars = line.chars();
    let Some(cmd) = chars.next() else {
        return Err(ConsoleError::Empty);
    };
    let arg = chars.as_str().trim();

    let number = || -> Result<f32, ConsoleError> {
        if arg.is_empty() {
            return Err(ConsoleError::MissingArgument(cmd));
        }
        arg.parse::<f32>().map_err(|_| ConsoleError::BadNumber(cmd))
    };

    let out = match cmd {
        'h' => ConsoleCommand::Help,
        'd' => ConsoleCommand::Dump,
        'p' => ConsoleCommand::App(AppCommand::ToggleWeightReport),
        't' => ConsoleCommand::App(AppCommand::Tare),
        'x' => ConsoleCommand::App(AppCommand::ResetRelay),
        'g' => ConsoleCommand::App(AppCommand::ToggleRelay),
        'r' => ConsoleCommand::App(AppCommand::CalibrateKnownMass(number()?)),
        'c' => ConsoleCommand::App(AppCommand::SetCalibrationFactor(number()?)),
        'w' => ConsoleCommand::App(AppCommand::SetSetpoint(number()?)),
        's' => ConsoleCommand::App(AppCommand::SetTimerThreshold(number()?)),
        other => return Err(ConsoleError::Unknown(other)),
    };
    Ok(out)
}
