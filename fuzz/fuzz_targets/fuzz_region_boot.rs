//! Fuzz target: `ParameterStore::initialize`
//!
//! Boots the store from an arbitrary region image and asserts that it
//! always ends up sealed, holding parameters that pass validation, and
//! that a second boot of the repaired region is clean.
//!
//! cargo fuzz run fuzz_region_boot

#![no_main]

use libfuzzer_sys::fuzz_target;
use smartscale::adapters::nvs::NvsRegion;
use smartscale::app::ports::NoIrqGate;
use smartscale::config::REGION_LEN;
use smartscale::store::{layout, Param, ParameterStore};

fuzz_target!(|data: &[u8]| {
    // Short inputs are padded with erased flash.
    let mut image = [0xFFu8; REGION_LEN];
    let n = data.len().min(REGION_LEN);
    image[..n].copy_from_slice(&data[..n]);

    let mut store = ParameterStore::new(NvsRegion::from_durable(image), NoIrqGate);
    store.initialize().expect("full-size region never fails");

    let params = store.snapshot();
    for p in Param::ALL {
        assert!(p.check_range(params.get(p)).is_ok(), "{:?} invalid after boot", p);
    }
    assert!(params.timer_threshold <= params.weight_setpoint);

    let durable = store.region().durable_bytes();
    assert_eq!(layout::stored_checksum(&durable), layout::compute_checksum(&durable));

    let mut again = ParameterStore::new(NvsRegion::from_durable(durable), NoIrqGate);
    assert!(again.initialize().expect("second boot").is_clean());
});
