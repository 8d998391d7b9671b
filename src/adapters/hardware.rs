//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the [`LoadCell`] and the [`RelayDriver`], exposing them through
//! [`SamplePort`] and [`RelayPort`].  [`SamplingIrqGate`] implements
//! [`IrqGate`] over the data-ready interrupt.  On non-espidf targets the
//! interrupt calls are no-ops and the pins are whatever the caller injects.

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::{IrqGate, RelayPort, SamplePort};
use crate::drivers::hw_init;
use crate::drivers::relay::RelayDriver;
use crate::sensors::load_cell::{LoadCell, WeightSample};
use crate::sensors::RawAdc;

/// Concrete adapter that combines the load cell and relay behind port traits.
pub struct HardwareAdapter<A: RawAdc, P: OutputPin> {
    load_cell: LoadCell<A>,
    relay: RelayDriver<P>,
}

impl<A: RawAdc, P: OutputPin> HardwareAdapter<A, P> {
    pub fn new(load_cell: LoadCell<A>, relay: RelayDriver<P>) -> Self {
        Self { load_cell, relay }
    }

    pub fn load_cell(&self) -> &LoadCell<A> {
        &self.load_cell
    }

    pub fn load_cell_mut(&mut self) -> &mut LoadCell<A> {
        &mut self.load_cell
    }
}

// ── SamplePort implementation ─────────────────────────────────

impl<A: RawAdc, P: OutputPin> SamplePort for HardwareAdapter<A, P> {
    fn refresh(&mut self, now_ms: u64) -> bool {
        match self.load_cell.service(now_ms) {
            Ok(changed) => changed,
            Err(e) => {
                // keep the last good sample
                warn!("load cell: {}", e);
                false
            }
        }
    }

    fn read_latest_sample(&self) -> WeightSample {
        self.load_cell.sample()
    }

    fn request_tare(&mut self) {
        self.load_cell.request_tare();
    }

    fn tare_in_progress(&self) -> bool {
        self.load_cell.tare_in_progress()
    }

    fn set_calibration_factor(&mut self, factor: f32) {
        self.load_cell.set_calibration_factor(factor);
    }

    fn calibration_for_known_mass(&self, mass: f32) -> Option<f32> {
        self.load_cell.calibration_for_known_mass(mass)
    }
}

// ── RelayPort implementation ──────────────────────────────────

impl<A: RawAdc, P: OutputPin> RelayPort for HardwareAdapter<A, P> {
    fn energize(&mut self) {
        self.relay.energize();
    }

    fn de_energize(&mut self) {
        self.relay.de_energize();
    }

    fn is_energized(&self) -> bool {
        self.relay.is_energized()
    }
}

// ── IrqGate implementation ────────────────────────────────────

/// Masks the HX711 data-ready interrupt on its DOUT pin.
pub struct SamplingIrqGate {
    dout_gpio: i32,
}

impl SamplingIrqGate {
    pub fn new(dout_gpio: i32) -> Self {
        Self { dout_gpio }
    }
}

impl IrqGate for SamplingIrqGate {
    fn disable_sampling_irq(&mut self) {
        hw_init::set_data_ready_irq(self.dout_gpio, false);
    }

    fn enable_sampling_irq(&mut self) {
        hw_init::set_data_ready_irq(self.dout_gpio, true);
    }
}
