//! GPIO pin assignments for the SmartScale controller board.
//!
//! Single source of truth for the default [`PinConfig`](crate::config::PinConfig).
//! Board variants override these through the controller config rather than
//! by editing drivers.

// ---------------------------------------------------------------------------
// HX711 load-cell ADC
// ---------------------------------------------------------------------------

/// Digital input: HX711 DOUT.  Falls LOW when a conversion is ready; the
/// falling edge drives the data-ready interrupt.
pub const HX711_DOUT_GPIO: i32 = 4;
/// Digital output: HX711 PD_SCK.  Held LOW between reads; a HIGH pulse
/// longer than 60 µs powers the chip down, so reads must not be preempted.
pub const HX711_SCK_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// Digital output: relay coil driver (active HIGH).
pub const RELAY_GPIO: i32 = 0;
