//! Unified error types for the servo router firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! boot sequence's error handling uniform. All variants are `Copy` so they
//! can be passed across task boundaries without allocation.

use core::fmt;

use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Non-volatile storage could not be brought up.
    Boot(BootError),
    /// The Zigbee stack failed to initialise or start.
    Mesh(MeshError),
    /// PWM / RMT / timer / GPIO initialisation failed.
    Peripheral(PeripheralError),
    /// A stored configuration override was rejected.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boot(e) => write!(f, "boot: {e}"),
            Self::Mesh(e) => write!(f, "mesh: {e}"),
            Self::Peripheral(e) => write!(f, "peripheral: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Boot errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// First `nvs_flash_init` failed for a reason other than corrupt pages.
    NvsInit(i32),
    /// Erasing a corrupt NVS partition failed.
    NvsErase(i32),
    /// NVS still refused to initialise after the single erase.
    NvsReinit(i32),
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NvsInit(rc) => write!(f, "NVS init failed (rc={rc})"),
            Self::NvsErase(rc) => write!(f, "NVS erase failed (rc={rc})"),
            Self::NvsReinit(rc) => write!(f, "NVS re-init after erase failed (rc={rc})"),
        }
    }
}

impl From<BootError> for Error {
    fn from(e: BootError) -> Self {
        Self::Boot(e)
    }
}

// ---------------------------------------------------------------------------
// Mesh stack errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshError {
    /// Radio / host platform configuration was rejected.
    PlatformConfig(i32),
    /// Endpoint or cluster registration failed.
    Register(i32),
    /// `esp_zb_start` returned an error.
    Start(i32),
    /// An identity string does not fit a ZCL character string.
    Identity,
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlatformConfig(rc) => write!(f, "platform config failed (rc={rc})"),
            Self::Register(rc) => write!(f, "endpoint registration failed (rc={rc})"),
            Self::Start(rc) => write!(f, "stack start failed (rc={rc})"),
            Self::Identity => write!(f, "identity string too long"),
        }
    }
}

impl From<MeshError> for Error {
    fn from(e: MeshError) -> Self {
        Self::Mesh(e)
    }
}

// ---------------------------------------------------------------------------
// Peripheral errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralError {
    /// LEDC timer configuration failed.
    LedcTimer(i32),
    /// LEDC channel configuration failed.
    LedcChannel(i32),
    /// A duty write or commit was rejected by the LEDC driver.
    LedcDuty(i32),
    /// Button GPIO configuration failed.
    Gpio(i32),
    /// The RMT channel driving the indicator pixel could not be set up.
    Rmt(i32),
    /// `esp_timer_create` for the auto-return timer failed.
    Timer(i32),
    /// A FreeRTOS task could not be spawned.
    Task,
}

impl fmt::Display for PeripheralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LedcTimer(rc) => write!(f, "LEDC timer config failed (rc={rc})"),
            Self::LedcChannel(rc) => write!(f, "LEDC channel config failed (rc={rc})"),
            Self::LedcDuty(rc) => write!(f, "LEDC duty write failed (rc={rc})"),
            Self::Gpio(rc) => write!(f, "GPIO config failed (rc={rc})"),
            Self::Rmt(rc) => write!(f, "RMT init failed (rc={rc})"),
            Self::Timer(rc) => write!(f, "esp_timer create failed (rc={rc})"),
            Self::Task => write!(f, "task spawn failed"),
        }
    }
}

impl From<PeripheralError> for Error {
    fn from(e: PeripheralError) -> Self {
        Self::Peripheral(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
