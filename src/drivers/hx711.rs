//! HX711 24-bit load-cell ADC.
//!
//! The bit-banged transfer comes from the `loadcell` crate; this wrapper
//! adapts it to [`RawAdc`] and maps its not-ready error onto
//! [`SamplingError::SignalDropout`].  Channel A at gain 128 is used.
//!
//! Data bits toggling DOUT also trip the falling-edge interrupt;
//! [`LoadCell`](crate::sensors::load_cell::LoadCell) re-checks `is_ready()`
//! before every read, which absorbs those.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use loadcell::hx711::HX711;
use loadcell::LoadCell as _;
use log::warn;

use crate::error::SamplingError;
use crate::sensors::RawAdc;

pub struct Hx711<DOUT, SCK, D> {
    inner: HX711<SCK, DOUT, D>,
}

impl<DOUT, SCK, D> Hx711<DOUT, SCK, D>
where
    DOUT: InputPin,
    SCK: OutputPin,
    D: DelayNs,
{
    /// SCK is driven low first, which wakes the chip and keeps it awake.
    pub fn new(dout: DOUT, mut sck: SCK, delay: D) -> Result<Self, SamplingError> {
        sck.set_low().map_err(|_| {
            warn!("Hx711: cannot drive SCK low");
            SamplingError::SignalDropout
        })?;
        Ok(Self {
            inner: HX711::new(sck, dout, delay),
        })
    }
}

impl<DOUT, SCK, D> RawAdc for Hx711<DOUT, SCK, D>
where
    DOUT: InputPin,
    SCK: OutputPin,
    D: DelayNs,
{
    fn is_ready(&mut self) -> bool {
        self.inner.is_ready()
    }

    fn read_raw(&mut self) -> Result<i32, SamplingError> {
        self.inner.read().map_err(|_| SamplingError::SignalDropout)
    }
}
