//! GPIO / peripheral assignments for the servo router board.
//!
//! Single source of truth for the boot-time defaults. The runtime values
//! live in [`DeviceConfig`](crate::config::DeviceConfig) so a stored
//! override can move a line without a rebuild.

// ---------------------------------------------------------------------------
// Servo (LEDC PWM)
// ---------------------------------------------------------------------------

/// LEDC output driving the servo signal line.
pub const SERVO_GPIO: i32 = 5;
/// Hobby servo frame rate.
pub const SERVO_PWM_FREQ_HZ: u32 = 50;
/// LEDC timer resolution. 13 bits gives duty values 0..=8191.
pub const SERVO_PWM_RESOLUTION_BITS: u32 = 13;
/// Largest duty value representable at [`SERVO_PWM_RESOLUTION_BITS`].
pub const SERVO_MAX_DUTY: u32 = (1 << SERVO_PWM_RESOLUTION_BITS) - 1;

// ---------------------------------------------------------------------------
// User button (active-low with external pull-up)
// ---------------------------------------------------------------------------

pub const BUTTON_GPIO: i32 = 9;

// ---------------------------------------------------------------------------
// Status indicator (single WS2812 pixel on RMT)
// ---------------------------------------------------------------------------

pub const LED_GPIO: i32 = 8;

/// Highest GPIO number on the ESP32-C6. The H2 stops at 27; a pin in the
/// gap is refused by the GPIO driver at init.
pub const MAX_GPIO: i32 = 30;

// ---------------------------------------------------------------------------
// Task cadences
// ---------------------------------------------------------------------------

/// Button poller period.
pub const BUTTON_POLL_MS: u32 = 20;
/// Indicator refresh period.
pub const INDICATOR_TICK_MS: u32 = 100;
