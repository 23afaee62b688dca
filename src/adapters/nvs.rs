//! NVS (Non-Volatile Storage) adapter.
//!
//! Brings up the default NVS partition and implements [`ConfigPort`] for
//! the optional configuration override.
//!
//! - Recovery: a partition reporting `NO_FREE_PAGES` or `NEW_VERSION_FOUND`
//!   is erased and re-initialised exactly once. The Zigbee stack keeps its
//!   network credentials in its own partition and is unaffected.
//! - Validation: the override is range-checked after loading. It is
//!   written at provisioning time by external tooling; the firmware only
//!   reads it.
//! - Format: postcard blob under namespace `servo`, key `devcfg`.

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::DeviceConfig;
use crate::error::BootError;
use log::info;

#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const CONFIG_NAMESPACE: &core::ffi::CStr = c"servo";
#[cfg(target_os = "espidf")]
const CONFIG_KEY: &core::ffi::CStr = c"devcfg";

/// Largest override blob accepted from flash.
const MAX_BLOB_SIZE: usize = 512;

/// What `nvs_flash_init` said and what recovery did about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NvsRecovery {
    Clean,
    ErasedOnce,
}

/// Run the init-erase-reinit sequence against the given primitives.
///
/// `needs_erase` classifies the first init's error code.
pub(crate) fn bring_up(
    mut init: impl FnMut() -> i32,
    mut erase: impl FnMut() -> i32,
    needs_erase: impl Fn(i32) -> bool,
) -> Result<NvsRecovery, BootError> {
    const OK: i32 = 0;
    let ret = init();
    if ret == OK {
        return Ok(NvsRecovery::Clean);
    }
    if !needs_erase(ret) {
        return Err(BootError::NvsInit(ret));
    }
    let ret = erase();
    if ret != OK {
        return Err(BootError::NvsErase(ret));
    }
    let ret = init();
    if ret != OK {
        return Err(BootError::NvsReinit(ret));
    }
    Ok(NvsRecovery::ErasedOnce)
}

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<&'static str, Vec<u8>>>,
}

impl NvsAdapter {
    /// Initialise NVS flash, erasing a corrupt or outdated partition once.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Result<Self, BootError> {
        // SAFETY: called once from main() before any other NVS user exists.
        let recovery = bring_up(
            || unsafe { nvs_flash_init() },
            || unsafe { nvs_flash_erase() },
            |rc| rc == ESP_ERR_NVS_NO_FREE_PAGES as i32 || rc == ESP_ERR_NVS_NEW_VERSION_FOUND as i32,
        )?;
        if recovery == NvsRecovery::ErasedOnce {
            warn!("NVS: partition erased and re-initialised");
        }
        info!("NvsAdapter: ESP-IDF NVS initialised");
        Ok(Self {})
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self, BootError> {
        info!("NvsAdapter: simulation backend");
        Ok(Self {
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    /// Open the config namespace read-only, run `f` with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut handle: nvs_handle_t = 0;
        // SAFETY: namespace is a static C string; handle is written on success.
        let ret = unsafe {
            nvs_open(CONFIG_NAMESPACE.as_ptr(), nvs_open_mode_t_NVS_READONLY, &mut handle)
        };
        if ret != ESP_OK as i32 {
            return Err(ret);
        }

        let result = f(handle);
        // SAFETY: handle was opened above and is not used after this.
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self) -> Result<Vec<u8>, ConfigError> {
        let result = Self::with_nvs_handle(|handle| {
            let mut size: usize = 0;
            // SAFETY: a null buffer asks NVS for the stored size only.
            let ret = unsafe {
                nvs_get_blob(handle, CONFIG_KEY.as_ptr(), core::ptr::null_mut(), &mut size)
            };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH as i32);
            }

            let mut buf = vec![0u8; size];
            // SAFETY: buf holds `size` bytes.
            let ret = unsafe {
                nvs_get_blob(handle, CONFIG_KEY.as_ptr(), buf.as_mut_ptr() as *mut _, &mut size)
            };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }
            buf.truncate(size);
            Ok(buf)
        });

        match result {
            Ok(bytes) => Ok(bytes),
            // A never-written namespace cannot be opened read-only.
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND as i32 => Err(ConfigError::NotFound),
            Err(e) if e == ESP_ERR_NVS_INVALID_LENGTH as i32 => Err(ConfigError::Corrupted),
            Err(e) => {
                warn!("NvsAdapter: NVS read error {}", e);
                Err(ConfigError::IoError)
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self) -> Result<Vec<u8>, ConfigError> {
        match self.store.borrow().get("servo::devcfg") {
            Some(bytes) if bytes.is_empty() || bytes.len() > MAX_BLOB_SIZE => {
                Err(ConfigError::Corrupted)
            }
            Some(bytes) => Ok(bytes.clone()),
            None => Err(ConfigError::NotFound),
        }
    }

    /// Store raw bytes as the override, the way a provisioning tool would.
    #[cfg(not(target_os = "espidf"))]
    pub fn inject_raw(&self, bytes: &[u8]) {
        self.store.borrow_mut().insert("servo::devcfg", bytes.to_vec());
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<DeviceConfig, ConfigError> {
        let bytes = self.read_blob()?;
        let cfg: DeviceConfig = postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        info!("NvsAdapter: loaded config override ({} bytes)", bytes.len());
        Ok(cfg)
    }
}
