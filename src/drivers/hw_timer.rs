//! Auto-return one-shot timer on ESP-IDF's esp_timer API.
//!
//! The callback runs in the esp_timer task (not ISR) and posts an
//! auto-return intent into the actuator channel. It carries the token of
//! the arming that scheduled it; the state machine drops tokens that are no
//! longer armed.
//!
//! The arming word packs `(token, deadline_ms)`. A callback dispatched just
//! before a stop-then-start sees the new deadline still in the future and
//! posts nothing, so it can never borrow the new token.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::app::ports::OneShotTimer;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// `token << 32 | deadline_ms`, or 0 when disarmed.
static ARMING: AtomicU64 = AtomicU64::new(0);

pub(crate) const fn pack(token: u32, deadline_ms: u32) -> u64 {
    ((token as u64) << 32) | deadline_ms as u64
}

/// Token to post for a callback firing at `now_ms`, if any.
pub(crate) fn due_token(arming: u64, now_ms: u32) -> Option<u32> {
    if arming == 0 {
        return None;
    }
    let token = (arming >> 32) as u32;
    let deadline = arming as u32;
    // Wrapping compare: fires once now has reached the deadline.
    (now_ms.wrapping_sub(deadline) as i32 >= 0).then_some(token)
}

#[cfg(target_os = "espidf")]
fn now_ms() -> u32 {
    // SAFETY: esp_timer_get_time is a counter read, callable from any task.
    (unsafe { esp_timer_get_time() } / 1_000) as u32
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn auto_return_cb(_arg: *mut core::ffi::c_void) {
    let arming = ARMING.load(Ordering::Acquire);
    if let Some(token) = due_token(arming, now_ms()) {
        // Disarm only if no re-arm slipped in meanwhile.
        let _ = ARMING.compare_exchange(arming, 0, Ordering::AcqRel, Ordering::Relaxed);
        crate::app::service::post(
            &crate::app::service::INTENTS,
            crate::app::actuator::Intent::auto_return(token),
        );
    }
}

// ── esp_timer backend ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct EspOneShot {
    handle: esp_timer_handle_t,
}

// SAFETY: the handle is only used by the task that owns this value;
// esp_timer calls are thread-safe.
#[cfg(target_os = "espidf")]
unsafe impl Send for EspOneShot {}

#[cfg(target_os = "espidf")]
impl EspOneShot {
    pub fn new() -> Result<Self, crate::error::PeripheralError> {
        let args = esp_timer_create_args_t {
            callback: Some(auto_return_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"auto_return".as_ptr(),
            skip_unhandled_events: false,
        };
        let mut handle: esp_timer_handle_t = core::ptr::null_mut();
        // SAFETY: args outlives the call; handle is written on success.
        let ret = unsafe { esp_timer_create(&args, &mut handle) };
        if ret != ESP_OK as i32 {
            return Err(crate::error::PeripheralError::Timer(ret));
        }
        log::info!("hw_timer: auto-return timer created");
        Ok(Self { handle })
    }
}

#[cfg(target_os = "espidf")]
impl OneShotTimer for EspOneShot {
    fn start_once(&mut self, delay_ms: u32, token: u32) {
        let deadline = now_ms().wrapping_add(delay_ms);
        ARMING.store(pack(token, deadline), Ordering::Release);
        // SAFETY: handle is valid for the program lifetime.
        let ret = unsafe { esp_timer_start_once(self.handle, u64::from(delay_ms) * 1_000) };
        if ret != ESP_OK as i32 {
            log::error!("hw_timer: start_once failed (rc={})", ret);
        }
    }

    fn stop(&mut self) {
        ARMING.store(0, Ordering::Release);
        // ESP_ERR_INVALID_STATE when idle or already fired; both are fine.
        // SAFETY: handle is valid for the program lifetime.
        unsafe { esp_timer_stop(self.handle) };
    }
}

// ── Simulation backend ────────────────────────────────────────

/// Host stand-in: records the arming, never fires.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct EspOneShot {
    now_ms: u32,
}

#[cfg(not(target_os = "espidf"))]
impl EspOneShot {
    pub fn new() -> Result<Self, crate::error::PeripheralError> {
        log::info!("hw_timer(sim): auto-return timer never fires");
        Ok(Self::default())
    }

    /// Token the real callback would post at `at_ms`.
    pub fn due_at(&self, at_ms: u32) -> Option<u32> {
        due_token(ARMING.load(Ordering::Acquire), at_ms)
    }
}

#[cfg(not(target_os = "espidf"))]
impl OneShotTimer for EspOneShot {
    fn start_once(&mut self, delay_ms: u32, token: u32) {
        ARMING.store(pack(token, self.now_ms.wrapping_add(delay_ms)), Ordering::Release);
    }

    fn stop(&mut self) {
        ARMING.store(0, Ordering::Release);
    }
}
