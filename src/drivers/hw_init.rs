//! One-shot interrupt setup for the load-cell data-ready line.
//!
//! The pins themselves are configured through esp-idf-hal `PinDriver`s in
//! `main()`; this module only attaches the DOUT falling-edge ISR and exposes
//! the mask/unmask calls the parameter store uses around durable writes.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    IsrInstallFailed(i32),
    IsrAttachFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrAttachFailed(rc) => write!(f, "GPIO ISR attach failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

// ── GPIO ISR ──────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn data_ready_gpio_isr(_arg: *mut core::ffi::c_void) {
    crate::events::data_ready_isr();
}

/// Attach the data-ready ISR to `dout_gpio` (falling edge).
/// Call after the DOUT pin is configured as an input.
#[cfg(target_os = "espidf")]
pub fn init_data_ready_isr(dout_gpio: i32) -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed.  The handler is a static fn that only
    // touches an atomic.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        gpio_set_intr_type(dout_gpio, gpio_int_type_t_GPIO_INTR_NEGEDGE);
        let ret = gpio_isr_handler_add(dout_gpio, Some(data_ready_gpio_isr), core::ptr::null_mut());
        if ret != ESP_OK {
            return Err(HwInitError::IsrAttachFailed(ret));
        }
        gpio_intr_enable(dout_gpio);
    }
    info!("hw_init: data-ready ISR on GPIO{}", dout_gpio);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_data_ready_isr(_dout_gpio: i32) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): data-ready ISR skipped");
    Ok(())
}

/// Mask or unmask the data-ready interrupt source.
#[cfg(target_os = "espidf")]
pub fn set_data_ready_irq(dout_gpio: i32, enabled: bool) {
    // SAFETY: register write on a pin whose ISR was attached at boot;
    // called from the main task only.
    unsafe {
        if enabled {
            gpio_intr_enable(dout_gpio);
        } else {
            gpio_intr_disable(dout_gpio);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn set_data_ready_irq(_dout_gpio: i32, _enabled: bool) {}
