//! Prioritised thread spawning for the single-core ESP32-H2 / C6.
//!
//! Wraps `esp_pthread_set_cfg()` so that `std::thread::spawn` creates a
//! FreeRTOS task with an explicit priority and stack size. On non-ESP
//! targets, falls back to a plain thread spawn.
//!
//! # ESP-IDF Threading Model
//!
//! ESP-IDF implements `std::thread` via pthreads, which are thin wrappers
//! around FreeRTOS tasks. `esp_pthread_set_cfg()` sets thread-local
//! configuration that applies to the *next* `pthread_create()` call from
//! the calling thread, so the config→spawn pair must not be interleaved
//! with other thread creation on the same thread.

use crate::error::PeripheralError;

/// Task priorities. The Zigbee task outranks everything it feeds.
pub mod priority {
    pub const INDICATOR: u8 = 3;
    pub const BUTTON: u8 = 4;
    pub const ACTUATOR: u8 = 5;
    pub const ZIGBEE: u8 = 6;
}

/// Spawn a thread with explicit priority and stack.
///
/// The `name` parameter must be a null-terminated string (e.g. `"button\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_task(
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> Result<std::thread::JoinHandle<()>, PeripheralError> {
    // SAFETY: the config is copied by esp_pthread_set_cfg; `name` is a
    // 'static null-terminated string.
    unsafe {
        let mut cfg = esp_idf_svc::sys::esp_create_default_pthread_config();
        cfg.prio = i32::from(priority);
        cfg.stack_size = (stack_kb * 1024) as _;
        cfg.thread_name = name.as_ptr() as *const _;
        let ret = esp_idf_svc::sys::esp_pthread_set_cfg(&cfg);
        if ret != esp_idf_svc::sys::ESP_OK as i32 {
            log::error!("esp_pthread_set_cfg failed (rc={})", ret);
            return Err(PeripheralError::Task);
        }
    }

    let display_name = name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' (pri={}, stack={}KB)",
        display_name,
        priority,
        stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .map_err(|_| PeripheralError::Task)
}

/// Simulation fallback. Ignores priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_task(
    _priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> Result<std::thread::JoinHandle<()>, PeripheralError> {
    let display_name = name.trim_end_matches('\0');
    log::info!("Spawning '{}' (sim, stack={}KB)", display_name, stack_kb);

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .map_err(|_| PeripheralError::Task)
}
