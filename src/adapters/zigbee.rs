//! Zigbee stack adapter.
//!
//! The esp-zigbee-lib API is macro- and struct-heavy, so a small C
//! component (`components/zb_bridge`) owns endpoint registration and the
//! stack callbacks, and exposes a flat `extern "C"` surface. This module:
//!
//! - implements [`MeshPort`] on top of that surface ([`ZigbeeMesh`]);
//! - hosts the [`NetworkAgent`] inside the stack task and routes signals,
//!   attribute writes and steering retries into it;
//! - translates bridge signal codes and commissioning modes.
//!
//! Threading: signal, attribute and retry callbacks run on the stack task.
//! `set_on_off`, `report_on_off` and `factory_reset` may be called from any
//! task; the bridge takes the stack lock for them.

use log::info;

use crate::app::network::{CommissioningMode, MeshSignal, SignalStatus};

#[cfg(target_os = "espidf")]
use core::ffi::c_void;
#[cfg(target_os = "espidf")]
use std::sync::Mutex;

#[cfg(target_os = "espidf")]
use log::error;

#[cfg(target_os = "espidf")]
use crate::adapters::log_sink::LogEventSink;
#[cfg(target_os = "espidf")]
use crate::app::actuator::Intent;
#[cfg(target_os = "espidf")]
use crate::app::network::{AttributeWrite, NetworkAgent};
#[cfg(target_os = "espidf")]
use crate::app::service::{self, INTENTS};
#[cfg(target_os = "espidf")]
use crate::app::state::SharedState;
#[cfg(target_os = "espidf")]
use crate::config::DeviceConfig;
#[cfg(target_os = "espidf")]
use crate::error::MeshError;
#[cfg(target_os = "espidf")]
use crate::zcl::BasicInfo;

use crate::app::network::NetworkInfo;
use crate::app::ports::MeshPort;

// ── Bridge codes (mirror zb_bridge.h) ─────────────────────────

const SIG_SKIP_STARTUP: u8 = 0;
const SIG_FIRST_START: u8 = 1;
const SIG_REBOOT: u8 = 2;
const SIG_STEERING: u8 = 3;
const SIG_LEAVE: u8 = 4;
const SIG_CAN_SLEEP: u8 = 5;

const MODE_INITIALIZATION: u8 = 0;
const MODE_STEERING: u8 = 1;
const MODE_STEERING_TOUCHLINK: u8 = 2;

/// Map a bridge signal code to a [`MeshSignal`]. `raw` is the stack's own
/// signal type, kept for signals the bridge does not name.
pub fn decode_signal(code: u8, raw: u32) -> MeshSignal {
    match code {
        SIG_SKIP_STARTUP => MeshSignal::SkipStartup,
        SIG_FIRST_START => MeshSignal::FirstStart,
        SIG_REBOOT => MeshSignal::Reboot,
        SIG_STEERING => MeshSignal::SteeringComplete,
        SIG_LEAVE => MeshSignal::Leave,
        SIG_CAN_SLEEP => MeshSignal::CanSleep,
        _ => MeshSignal::Other(raw),
    }
}

/// `ESP_OK` is zero; anything else is the failure code.
pub fn decode_status(rc: i32) -> SignalStatus {
    if rc == 0 { Ok(()) } else { Err(rc) }
}

pub fn encode_mode(mode: CommissioningMode) -> u8 {
    match mode {
        CommissioningMode::Initialization => MODE_INITIALIZATION,
        CommissioningMode::NetworkSteering { touchlink: false } => MODE_STEERING,
        CommissioningMode::NetworkSteering { touchlink: true } => MODE_STEERING_TOUCHLINK,
    }
}

// ── FFI ───────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
type SignalCb = unsafe extern "C" fn(code: u8, status: i32, raw_type: u32, ctx: *mut c_void);
#[cfg(target_os = "espidf")]
type AttrCb = unsafe extern "C" fn(
    endpoint: u8,
    cluster: u16,
    attr: u16,
    data_type: u8,
    value: *const u8,
    len: usize,
    ctx: *mut c_void,
);
#[cfg(target_os = "espidf")]
type RetryCb = unsafe extern "C" fn(ctx: *mut c_void);

/// `zb_bridge_config_t`.
#[cfg(target_os = "espidf")]
#[repr(C)]
struct BridgeConfig {
    endpoint: u8,
    channel_mask: u32,
    max_children: u8,
    nvram_erase_at_start: bool,
    manufacturer_name: *const u8,
    model_identifier: *const u8,
    date_code: *const u8,
    zcl_version: u8,
    application_version: u8,
    stack_version: u8,
    hw_version: u8,
    power_source: u8,
}

#[cfg(target_os = "espidf")]
unsafe extern "C" {
    fn zb_bridge_platform_init() -> i32;
    fn zb_bridge_init(
        cfg: *const BridgeConfig,
        signal_cb: SignalCb,
        attr_cb: AttrCb,
        retry_cb: RetryCb,
        ctx: *mut c_void,
    ) -> i32;
    fn zb_bridge_start() -> i32;
    fn zb_bridge_main_loop();
    fn zb_bridge_start_commissioning(mode: u8);
    fn zb_bridge_schedule_steering_retry(delay_ms: u32);
    fn zb_bridge_pan_id() -> u16;
    fn zb_bridge_short_address() -> u16;
    fn zb_bridge_channel() -> u8;
    fn zb_bridge_set_on_off(endpoint: u8, on: bool);
    fn zb_bridge_report_on_off(endpoint: u8);
    fn zb_bridge_factory_reset() -> bool;
}

// ── MeshPort ──────────────────────────────────────────────────

/// Handle to the process-wide Zigbee stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZigbeeMesh;

#[cfg(target_os = "espidf")]
impl MeshPort for ZigbeeMesh {
    fn begin_commissioning(&mut self, mode: CommissioningMode) {
        // SAFETY: only reached from stack callbacks, which run on the stack task.
        unsafe { zb_bridge_start_commissioning(encode_mode(mode)) }
    }

    fn schedule_steering_retry(&mut self, delay_ms: u32) {
        // SAFETY: as above.
        unsafe { zb_bridge_schedule_steering_retry(delay_ms) }
    }

    fn network_info(&self) -> NetworkInfo {
        // SAFETY: plain getters on the stack's NIB, read on the stack task.
        unsafe {
            NetworkInfo {
                pan_id: zb_bridge_pan_id(),
                short_address: zb_bridge_short_address(),
                channel: zb_bridge_channel(),
            }
        }
    }

    fn set_on_off(&mut self, endpoint: u8, on: bool) {
        // SAFETY: the bridge takes the stack lock.
        unsafe { zb_bridge_set_on_off(endpoint, on) }
    }

    fn report_on_off(&mut self, endpoint: u8) {
        // SAFETY: the bridge takes the stack lock.
        unsafe { zb_bridge_report_on_off(endpoint) }
    }

    fn factory_reset(&mut self) -> bool {
        // SAFETY: the bridge takes the stack lock. The stack restarts the chip.
        unsafe { zb_bridge_factory_reset() }
    }
}

/// Host stand-in: logs what would reach the stack.
#[cfg(not(target_os = "espidf"))]
impl MeshPort for ZigbeeMesh {
    fn begin_commissioning(&mut self, mode: CommissioningMode) {
        info!("zigbee(sim): commissioning mode {}", encode_mode(mode));
    }

    fn schedule_steering_retry(&mut self, delay_ms: u32) {
        info!("zigbee(sim): steering retry in {} ms", delay_ms);
    }

    fn network_info(&self) -> NetworkInfo {
        NetworkInfo::default()
    }

    fn set_on_off(&mut self, endpoint: u8, on: bool) {
        log::debug!("zigbee(sim): ep{} on_off={}", endpoint, on);
    }

    fn report_on_off(&mut self, endpoint: u8) {
        log::debug!("zigbee(sim): ep{} report on_off", endpoint);
    }

    fn factory_reset(&mut self) -> bool {
        info!("zigbee(sim): factory reset");
        true
    }
}

// ── Stack task ────────────────────────────────────────────────

/// State reachable from the bridge callbacks.
#[cfg(target_os = "espidf")]
struct StackContext {
    /// Only the stack task locks this, so it is never contended.
    agent: Mutex<NetworkAgent<'static, ZigbeeMesh>>,
}

#[cfg(target_os = "espidf")]
impl StackContext {
    fn with_agent<R>(&self, f: impl FnOnce(&mut NetworkAgent<'static, ZigbeeMesh>) -> R) -> R {
        let mut agent = self.agent.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut agent)
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn on_signal(code: u8, status: i32, raw_type: u32, ctx: *mut c_void) {
    // SAFETY: ctx is the leaked StackContext passed to zb_bridge_init.
    let ctx = unsafe { &*(ctx as *const StackContext) };
    let signal = decode_signal(code, raw_type);
    ctx.with_agent(|agent| agent.handle_signal(signal, decode_status(status), &mut LogEventSink));
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn on_attribute(
    endpoint: u8,
    cluster: u16,
    attr: u16,
    data_type: u8,
    value: *const u8,
    len: usize,
    ctx: *mut c_void,
) {
    // SAFETY: ctx is the leaked StackContext passed to zb_bridge_init.
    let ctx = unsafe { &*(ctx as *const StackContext) };
    let value: &[u8] = if value.is_null() {
        &[]
    } else {
        // SAFETY: the stack guarantees `len` readable bytes for the callback's duration.
        unsafe { core::slice::from_raw_parts(value, len) }
    };
    let write = AttributeWrite {
        endpoint,
        cluster,
        attribute: attr,
        data_type,
        value,
    };
    if let Some(cmd) = ctx.with_agent(|agent| agent.handle_attribute_write(&write)) {
        service::post(&INTENTS, Intent::remote(cmd));
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn on_steering_retry(ctx: *mut c_void) {
    // SAFETY: ctx is the leaked StackContext passed to zb_bridge_init.
    let ctx = unsafe { &*(ctx as *const StackContext) };
    ctx.with_agent(|agent| agent.retry_steering());
}

/// Configure, register and start the stack, then run its main loop on the
/// calling task. Returns only on a start-up error.
#[cfg(target_os = "espidf")]
pub fn run(config: &DeviceConfig, state: &'static SharedState) -> Result<(), MeshError> {
    let basic = BasicInfo::new(
        &config.manufacturer_name,
        &config.model_identifier,
        &config.date_code,
        config.application_version,
        config.stack_version,
        config.hw_version,
    )
    .map_err(|_| MeshError::Identity)?;

    let ctx: &'static StackContext = Box::leak(Box::new(StackContext {
        agent: Mutex::new(NetworkAgent::new(
            ZigbeeMesh,
            &state.commissioning,
            config.endpoint_id,
            config.touchlink_target,
        )),
    }));

    // SAFETY: called once, before any other stack call.
    let rc = unsafe { zb_bridge_platform_init() };
    if rc != 0 {
        ctx.with_agent(|agent| agent.stack_failed(rc, &mut LogEventSink));
        return Err(MeshError::PlatformConfig(rc));
    }

    let bridge_cfg = BridgeConfig {
        endpoint: config.endpoint_id,
        channel_mask: config.channel_mask.bits(),
        max_children: config.max_children,
        nvram_erase_at_start: config.nvram_erase_at_start,
        manufacturer_name: basic.manufacturer_name.as_ptr(),
        model_identifier: basic.model_identifier.as_ptr(),
        date_code: basic.date_code.as_ptr(),
        zcl_version: basic.zcl_version,
        application_version: basic.application_version,
        stack_version: basic.stack_version,
        hw_version: basic.hw_version,
        power_source: basic.power_source,
    };
    // SAFETY: the bridge copies the identity strings; ctx lives forever.
    let rc = unsafe {
        zb_bridge_init(
            &bridge_cfg,
            on_signal,
            on_attribute,
            on_steering_retry,
            ctx as *const StackContext as *mut c_void,
        )
    };
    if rc != 0 {
        ctx.with_agent(|agent| agent.stack_failed(rc, &mut LogEventSink));
        return Err(MeshError::Register(rc));
    }

    // SAFETY: init succeeded on this task.
    let rc = unsafe { zb_bridge_start() };
    if rc != 0 {
        ctx.with_agent(|agent| agent.stack_failed(rc, &mut LogEventSink));
        return Err(MeshError::Start(rc));
    }

    info!(
        "ZB: router started (ep={}, mask=0x{:08x}, touchlink={})",
        config.endpoint_id,
        config.channel_mask.bits(),
        config.touchlink_target
    );
    // SAFETY: stack started on this task; the loop does not return.
    unsafe { zb_bridge_main_loop() };
    error!("ZB: main loop returned");
    Ok(())
}
