//! Device configuration parameters.
//!
//! Every tunable of the servo router in one immutable-after-boot record.
//! Two presets cover the shipped hardware variants; either can be replaced
//! at boot by a validated override stored in NVS.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::app::events::AppEvent;
use crate::app::ports::{ConfigError, ConfigPort, EventSink};
use crate::pins;
use crate::zcl::{ChannelMask, MAX_ZCL_STRING};

/// Longest date code the basic cluster accepts.
pub const MAX_DATE_CODE: usize = 16;

/// Core device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    // --- Servo ---
    /// Resting angle (degrees, 0-180).
    pub rest_angle_deg: u8,
    /// Angle reached by a play (degrees, 0-180).
    pub target_angle_deg: u8,
    /// Delay before a played servo returns to rest.
    pub auto_return_delay_ms: u32,
    /// LEDC duty at 0 degrees. Ordering against `duty_at_180_deg` is free.
    pub duty_at_0_deg: u16,
    /// LEDC duty at 180 degrees.
    pub duty_at_180_deg: u16,
    /// Servo frame rate; hobby servos only accept 50.
    pub pwm_frequency_hz: u32,

    // --- Button ---
    pub button_debounce_ms: u32,
    /// Hold time after which release triggers a factory reset.
    pub button_long_press_ms: u32,

    // --- Zigbee identity ---
    pub endpoint_id: u8,
    pub channel_mask: ChannelMask,
    pub manufacturer_name: String<MAX_ZCL_STRING>,
    pub model_identifier: String<MAX_ZCL_STRING>,
    pub date_code: String<MAX_DATE_CODE>,
    pub application_version: u8,
    pub stack_version: u8,
    pub hw_version: u8,
    /// Router child table size.
    pub max_children: u8,
    /// Also accept Touchlink commissioning while steering.
    pub touchlink_target: bool,
    /// Wipe stored network credentials on every boot. Prevents rejoin.
    pub nvram_erase_at_start: bool,

    // --- Pins ---
    pub servo_gpio: i32,
    pub button_gpio: i32,
    pub led_gpio: i32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            // Servo
            rest_angle_deg: 20,
            target_angle_deg: 160,
            auto_return_delay_ms: 2000,
            duty_at_0_deg: 205,   // ~0.5 ms pulse at 13 bit / 50 Hz
            duty_at_180_deg: 1024, // ~2.5 ms
            pwm_frequency_hz: pins::SERVO_PWM_FREQ_HZ,

            // Button
            button_debounce_ms: 50,
            button_long_press_ms: 3000,

            // Zigbee
            endpoint_id: 10,
            channel_mask: ChannelMask::All,
            manufacturer_name: label("ESPRESSIF"),
            model_identifier: label("ESP32H2_ZB_SWITCH"),
            date_code: label("20240101"),
            application_version: 1,
            stack_version: 2,
            hw_version: 1,
            max_children: 10,
            touchlink_target: false,
            nvram_erase_at_start: false,

            // Pins
            servo_gpio: pins::SERVO_GPIO,
            button_gpio: pins::BUTTON_GPIO,
            led_gpio: pins::LED_GPIO,
        }
    }
}

impl DeviceConfig {
    /// Identity and travel of the plug-style build that presents itself
    /// to a Hue bridge as a Signify smart plug.
    pub fn hue_plug() -> Self {
        Self {
            target_angle_deg: 180,
            endpoint_id: 11,
            channel_mask: ChannelMask::Hue,
            manufacturer_name: label("Signify Netherlands B.V."),
            model_identifier: label("LOM001"),
            touchlink_target: true,
            ..Self::default()
        }
    }

    /// Range-check every field. Values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rest_angle_deg > 180 {
            return Err(ConfigError::ValidationFailed("rest_angle_deg must be 0-180"));
        }
        if self.target_angle_deg > 180 {
            return Err(ConfigError::ValidationFailed("target_angle_deg must be 0-180"));
        }
        if u32::from(self.duty_at_0_deg) > pins::SERVO_MAX_DUTY
            || u32::from(self.duty_at_180_deg) > pins::SERVO_MAX_DUTY
        {
            return Err(ConfigError::ValidationFailed("duty endpoints must be 0-8191"));
        }
        if self.pwm_frequency_hz != pins::SERVO_PWM_FREQ_HZ {
            return Err(ConfigError::ValidationFailed("pwm_frequency_hz must be 50"));
        }
        if self.auto_return_delay_ms == 0 {
            return Err(ConfigError::ValidationFailed("auto_return_delay_ms must be > 0"));
        }
        if self.button_debounce_ms == 0 || self.button_debounce_ms >= self.button_long_press_ms {
            return Err(ConfigError::ValidationFailed(
                "button_debounce_ms must be > 0 and < button_long_press_ms",
            ));
        }
        if !(1..=240).contains(&self.endpoint_id) {
            return Err(ConfigError::ValidationFailed("endpoint_id must be 1-240"));
        }
        let lines = [self.servo_gpio, self.button_gpio, self.led_gpio];
        if lines.iter().any(|gpio| !(0..=pins::MAX_GPIO).contains(gpio)) {
            return Err(ConfigError::ValidationFailed("GPIO numbers must be 0-30"));
        }
        if lines[0] == lines[1] || lines[0] == lines[2] || lines[1] == lines[2] {
            return Err(ConfigError::ValidationFailed("servo, button and LED need distinct GPIOs"));
        }
        if self.manufacturer_name.is_empty() || self.model_identifier.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "manufacturer_name and model_identifier must be non-empty",
            ));
        }
        Ok(())
    }
}

/// The stored override if there is a usable one, `fallback` otherwise.
///
/// A missing override is normal. Anything else is reported through `sink`
/// and the fallback is used.
pub fn load_or(
    store: &impl ConfigPort,
    fallback: DeviceConfig,
    sink: &mut impl EventSink,
) -> DeviceConfig {
    match store.load() {
        Ok(cfg) => cfg,
        Err(ConfigError::NotFound) => fallback,
        Err(e) => {
            sink.emit(&AppEvent::ConfigFallback(e));
            fallback
        }
    }
}

/// Build a fixed-capacity label. Callers pass literals that fit.
fn label<const N: usize>(s: &str) -> String<N> {
    String::try_from(s).unwrap_or_default()
}
