//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the rules of the SmartScale controller: parameter
//! persistence, relay latching and the band timer.  All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
