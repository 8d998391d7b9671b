//! NVS (Non-Volatile Storage) region adapter.
//!
//! Implements [`RegionPort`] as one fixed-size blob in the `smartscale` NVS
//! namespace.  Writes are staged in a RAM mirror; `commit()` pushes the
//! whole mirror with `nvs_set_blob` + `nvs_commit`, which ESP-IDF applies
//! atomically.
//!
//! The host backend keeps the staged mirror and the durable bytes apart so
//! tests can simulate power loss between a write and its commit.

use crate::app::ports::{RegionPort, StorageError};
use crate::config::REGION_LEN;
use crate::store::RegionImage;
use log::info;

#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const NAMESPACE: &[u8] = b"smartscale\0";
#[cfg(target_os = "espidf")]
const BLOB_KEY: &[u8] = b"params\0";

/// Erased flash reads back as all ones.
const ERASED: u8 = 0xFF;

pub struct NvsRegion {
    mirror: Vec<u8>,
    #[cfg(not(target_os = "espidf"))]
    durable: Vec<u8>,
    #[cfg(not(target_os = "espidf"))]
    commits: u32,
}

impl NvsRegion {
    /// Initialise NVS flash and load the stored blob into the mirror.
    ///
    /// A missing or short blob leaves the mirror erased, which the store then
    /// treats as a checksum failure.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Result<Self, StorageError> {
        // SAFETY: called once from the main task before any other NVS access.
        let ret = unsafe { nvs_flash_init() };
        if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
            warn!("NVS: erasing and re-initialising flash partition");
            if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                return Err(StorageError::Io);
            }
        } else if ret != ESP_OK {
            return Err(StorageError::Io);
        }

        let mut mirror = vec![ERASED; REGION_LEN];
        let loaded = Self::with_nvs_handle(false, |handle| {
            let mut size = REGION_LEN;
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    BLOB_KEY.as_ptr() as *const _,
                    mirror.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(size)
        });
        match loaded {
            Ok(size) if size == REGION_LEN => {
                info!("NvsRegion: loaded {} bytes", size);
            }
            Ok(size) => {
                warn!("NvsRegion: short blob ({} bytes), treating as erased", size);
                mirror.fill(ERASED);
            }
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => info!("NvsRegion: no stored region"),
            Err(e) => {
                warn!("NvsRegion: read error {}, treating as erased", e);
                mirror.fill(ERASED);
            }
        }
        Ok(Self { mirror })
    }

    /// Open the namespace, run `f` with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let ret = unsafe { nvs_open(NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    fn check_bounds(&self, offset: usize, len: usize) -> Result<(), StorageError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.mirror.len() => Ok(()),
            _ => Err(StorageError::OutOfBounds),
        }
    }
}

// ── Host simulation ───────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl NvsRegion {
    /// Factory-fresh (erased) region.
    pub fn new() -> Self {
        Self::with_len(REGION_LEN)
    }

    pub fn with_len(len: usize) -> Self {
        info!("NvsRegion: simulation backend ({} bytes)", len);
        Self {
            mirror: vec![ERASED; len],
            durable: vec![ERASED; len],
            commits: 0,
        }
    }

    /// Region whose durable contents are `image`, as found after a reboot.
    pub fn from_durable(image: RegionImage) -> Self {
        Self {
            mirror: image.to_vec(),
            durable: image.to_vec(),
            commits: 0,
        }
    }

    /// What survives a power cycle.
    pub fn durable_bytes(&self) -> RegionImage {
        let mut image = [ERASED; REGION_LEN];
        let n = self.durable.len().min(REGION_LEN);
        image[..n].copy_from_slice(&self.durable[..n]);
        image
    }

    /// Power cycle: staged but uncommitted writes are lost.
    pub fn reboot(&self) -> Self {
        Self {
            mirror: self.durable.clone(),
            durable: self.durable.clone(),
            commits: 0,
        }
    }

    pub fn commit_count(&self) -> u32 {
        self.commits
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for NvsRegion {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionPort for NvsRegion {
    fn len(&self) -> usize {
        self.mirror.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        self.check_bounds(offset, buf.len())?;
        buf.copy_from_slice(&self.mirror[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        self.check_bounds(offset, data.len())?;
        self.mirror[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.durable.copy_from_slice(&self.mirror);
            self.commits += 1;
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let mirror = &self.mirror;
            let result = Self::with_nvs_handle(true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        BLOB_KEY.as_ptr() as *const _,
                        mirror.as_ptr() as *const _,
                        mirror.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|e| {
                warn!("NvsRegion: commit failed {}", e);
                StorageError::Io
            })
        }
    }
}
