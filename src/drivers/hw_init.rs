//! One-shot hardware peripheral initialization.
//!
//! Configures the servo LEDC timer/channel and the button GPIO using raw
//! ESP-IDF sys calls. Called once from `main()` before any task starts.
//! The handles returned here are never released.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use core::convert::Infallible;

use crate::app::ports::{PwmError, PwmPort};
use crate::error::PeripheralError;

// ── LEDC PWM ─────────────────────────────────────────────────

/// LEDC channel carrying the servo signal.
pub const LEDC_CH_SERVO: u32 = 0;

/// Timer 0 at `freq_hz` and 13-bit resolution, channel 0 on `gpio`.
#[cfg(target_os = "espidf")]
pub fn init_servo_pwm(gpio: i32, freq_hz: u32) -> Result<LedcChannel, PeripheralError> {
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_13_BIT,
        freq_hz,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    // SAFETY: called once from main() before the actuator task exists.
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK as i32 {
        return Err(PeripheralError::LedcTimer(ret));
    }

    let channel = ledc_channel_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel: LEDC_CH_SERVO,
        timer_sel: ledc_timer_t_LEDC_TIMER_0,
        intr_type: ledc_intr_type_t_LEDC_INTR_DISABLE,
        gpio_num: gpio,
        duty: 0,
        hpoint: 0,
        ..Default::default()
    };
    // SAFETY: as above.
    let ret = unsafe { ledc_channel_config(&channel) };
    if ret != ESP_OK as i32 {
        return Err(PeripheralError::LedcChannel(ret));
    }

    info!("hw_init: LEDC servo on GPIO{} ({} Hz, 13 bit)", gpio, freq_hz);
    Ok(LedcChannel {
        channel: LEDC_CH_SERVO,
    })
}

#[cfg(not(target_os = "espidf"))]
pub fn init_servo_pwm(gpio: i32, freq_hz: u32) -> Result<LedcChannel, PeripheralError> {
    log::info!("hw_init(sim): LEDC servo on GPIO{} ({} Hz) skipped", gpio, freq_hz);
    Ok(LedcChannel {
        channel: LEDC_CH_SERVO,
    })
}

/// A configured LEDC channel. Owned by the actuator task.
#[derive(Debug)]
pub struct LedcChannel {
    channel: u32,
}

#[cfg(target_os = "espidf")]
impl PwmPort for LedcChannel {
    fn set_duty(&mut self, duty: u32) -> Result<(), PwmError> {
        // SAFETY: the channel was configured in init_servo_pwm(); only the
        // owning task writes its duty register.
        let ret = unsafe { ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, self.channel, duty) };
        if ret != ESP_OK as i32 {
            return Err(PwmError(ret));
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), PwmError> {
        // SAFETY: as for set_duty.
        let ret = unsafe { ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, self.channel) };
        if ret != ESP_OK as i32 {
            return Err(PwmError(ret));
        }
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl PwmPort for LedcChannel {
    fn set_duty(&mut self, duty: u32) -> Result<(), PwmError> {
        log::trace!("hw_init(sim): LEDC ch{} duty={}", self.channel, duty);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), PwmError> {
        Ok(())
    }
}

// ── Button GPIO ───────────────────────────────────────────────

/// Input with pull-up, no interrupt. The button is polled.
#[cfg(target_os = "espidf")]
pub fn init_button(gpio: i32) -> Result<GpioInput, PeripheralError> {
    let cfg = gpio_config_t {
        pin_bit_mask: pin_mask(gpio)?,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: called once from main() before the button task exists.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(PeripheralError::Gpio(ret));
    }
    info!("hw_init: button on GPIO{} (pull-up, polled)", gpio);
    Ok(GpioInput { pin: gpio })
}

#[cfg(not(target_os = "espidf"))]
pub fn init_button(gpio: i32) -> Result<GpioInput, PeripheralError> {
    pin_mask(gpio)?;
    log::info!("hw_init(sim): button on GPIO{} skipped", gpio);
    Ok(GpioInput { pin: gpio })
}

/// `gpio_config` bit mask for one line.
fn pin_mask(gpio: i32) -> Result<u64, PeripheralError> {
    u32::try_from(gpio)
        .ok()
        .and_then(|bit| 1u64.checked_shl(bit))
        .ok_or(PeripheralError::Gpio(GPIO_INVALID_ARG))
}

/// `ESP_ERR_INVALID_ARG`, also used on the host.
const GPIO_INVALID_ARG: i32 = 0x102;

/// A configured input line, read through `embedded-hal`.
#[derive(Debug)]
pub struct GpioInput {
    pin: i32,
}

impl GpioInput {
    #[cfg(target_os = "espidf")]
    fn level(&self) -> bool {
        // SAFETY: gpio_get_level is a register read on a configured input.
        (unsafe { gpio_get_level(self.pin) }) != 0
    }

    /// Sim lines idle high, like a released button on its pull-up.
    #[cfg(not(target_os = "espidf"))]
    fn level(&self) -> bool {
        let _ = self.pin;
        true
    }
}

impl embedded_hal::digital::ErrorType for GpioInput {
    type Error = Infallible;
}

impl embedded_hal::digital::InputPin for GpioInput {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level())
    }
}
