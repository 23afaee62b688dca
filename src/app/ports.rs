//! Port traits. The hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ state machines (domain)
//! ```
//!
//! Driven adapters (LEDC, esp_timer, RMT pixel, Zigbee stack, NVS) implement
//! these traits. The domain types consume them via generics, so the core
//! never touches hardware directly and runs unchanged on the host.
//!
//! The button line is the exception: it is read through
//! [`embedded_hal::digital::InputPin`] and debounced with
//! [`embedded_hal::delay::DelayNs`] rather than a bespoke port.

use crate::app::network::{CommissioningMode, NetworkInfo};
use crate::config::DeviceConfig;

// ───────────────────────────────────────────────────────────────
// PWM port (driven adapter: domain → LEDC)
// ───────────────────────────────────────────────────────────────

/// One PWM channel. Duty values are in timer ticks at the configured
/// resolution; a new duty takes effect only after [`commit`](Self::commit).
pub trait PwmPort {
    fn set_duty(&mut self, duty: u32) -> Result<(), PwmError>;

    fn commit(&mut self) -> Result<(), PwmError>;
}

// ───────────────────────────────────────────────────────────────
// One-shot timer port (driven adapter: domain → esp_timer)
// ───────────────────────────────────────────────────────────────

/// A single restartable one-shot alarm.
///
/// On expiry the adapter posts an auto-return intent carrying `token` back
/// into the actuator channel. Stopping an idle or already-fired timer is a
/// no-op.
pub trait OneShotTimer {
    fn start_once(&mut self, delay_ms: u32, token: u32);

    fn stop(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Pixel port (driven adapter: domain → WS2812 over RMT)
// ───────────────────────────────────────────────────────────────

/// A single addressable RGB pixel. [`set_pixel`](Self::set_pixel) stages
/// the colour, [`refresh`](Self::refresh) latches it onto the wire.
pub trait PixelPort {
    fn set_pixel(&mut self, r: u8, g: u8, b: u8) -> Result<(), PixelError>;

    fn refresh(&mut self) -> Result<(), PixelError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds since boot.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Mesh port (driven adapter: domain → Zigbee stack)
// ───────────────────────────────────────────────────────────────

/// The operations the core needs from the Zigbee stack.
///
/// Implementations are expected to be cheap handles; the stack itself is
/// the one process-wide singleton.
pub trait MeshPort {
    /// Start BDB top-level commissioning in `mode`.
    fn begin_commissioning(&mut self, mode: CommissioningMode);

    /// Re-run network steering after `delay_ms` on the stack's scheduler.
    fn schedule_steering_retry(&mut self, delay_ms: u32);

    /// Identifiers of the network the node currently sits on.
    fn network_info(&self) -> NetworkInfo;

    /// Update the local on/off attribute without sending anything.
    fn set_on_off(&mut self, endpoint: u8, on: bool);

    /// Send an unsolicited on/off attribute report. The destination is
    /// whatever the binding table resolves.
    fn report_on_off(&mut self, endpoint: u8);

    /// Erase network credentials and restart the stack unpaired.
    ///
    /// Returns `false` if the stack refused, for instance because it never
    /// started. On success the chip restarts and this does not return.
    fn factory_reset(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / attribute sync)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Fan an event out to two sinks, left first.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &super::events::AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: &super::events::AppEvent) {
        (**self).emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads the device configuration override. The override is written at
/// provisioning time; configuration is immutable once the device boots.
///
/// # Validation
///
/// Implementations MUST validate after loading. Out-of-range values are
/// rejected with [`ConfigError::ValidationFailed`], never clamped.
pub trait ConfigPort {
    /// Load the stored override. [`ConfigError::NotFound`] if there is none.
    fn load(&self) -> Result<DeviceConfig, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// A PWM write rejected by the peripheral. Carries the driver's error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmError(pub i32);

/// A pixel update rejected by the RMT driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelError(pub i32);

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No override stored (first boot).
    NotFound,
    /// Stored blob failed deserialization.
    Corrupted,
    /// A field failed range validation.
    /// The `&'static str` names the field and its range.
    ValidationFailed(&'static str),
    /// Backend I/O error.
    IoError,
}

impl core::fmt::Display for PwmError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PWM write rejected (rc={})", self.0)
    }
}

impl core::fmt::Display for PixelError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "pixel update rejected (rc={})", self.0)
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
