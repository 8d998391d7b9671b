//! Relay coil driver.
//!
//! Pure actuator: no validation, no latching policy (that lives in the
//! controller).  Both commands are idempotent and only touch the pin on an
//! actual change.

use embedded_hal::digital::OutputPin;
use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Off,
    On,
}

pub struct RelayDriver<P> {
    pin: P,
    active_high: bool,
    state: RelayState,
    write_errors: u32,
}

impl<P: OutputPin> RelayDriver<P> {
    /// Drives the pin to the de-energised level immediately.
    pub fn new(pin: P, active_high: bool) -> Self {
        let mut d = Self {
            pin,
            active_high,
            state: RelayState::Off,
            write_errors: 0,
        };
        d.drive(false);
        d
    }

    pub fn energize(&mut self) {
        if self.state != RelayState::On {
            self.drive(true);
            self.state = RelayState::On;
        }
    }

    pub fn de_energize(&mut self) {
        if self.state != RelayState::Off {
            self.drive(false);
            self.state = RelayState::Off;
        }
    }

    pub fn is_energized(&self) -> bool {
        self.state == RelayState::On
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn write_errors(&self) -> u32 {
        self.write_errors
    }

    fn drive(&mut self, on: bool) {
        let high = on == self.active_high;
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if res.is_err() {
            self.write_errors = self.write_errors.saturating_add(1);
            warn!("relay: pin write failed (on={})", on);
        }
    }
}
