//! Servo Router Firmware: main entry point
//!
//! Boots the board, then hands every activity its own FreeRTOS task.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  button task ──ShortRelease──▶ INTENTS ◀──remote write── zigbee task
//! │       │                          ▲                        │   │
//! │       └─LongRelease─▶ factory reset   esp_timer (auto-return) │
//! │                                  │                            │
//! │                       actuator task (sole servo owner)        │
//! │                                  │                            │
//! │            LogEventSink + AttributeReporter ──▶ ZCL on/off    │
//! │                                                               │
//! │  indicator task reads CommissioningCell + ButtonPhaseCell     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::AnyOutputPin;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::rmt::CHANNEL0;
use log::{error, info};

use servo_router::adapters::log_sink::LogEventSink;
use servo_router::adapters::nvs::NvsAdapter;
use servo_router::adapters::time::Esp32TimeAdapter;
use servo_router::adapters::zigbee::{self, ZigbeeMesh};
use servo_router::app::actuator::{ActuatorSettings, ActuatorStateMachine};
use servo_router::app::commands::{self, Dispatched};
use servo_router::app::network::AttributeReporter;
use servo_router::app::service::{ActuatorService, INTENTS};
use servo_router::app::state::SharedState;
use servo_router::config::{self, DeviceConfig};
use servo_router::drivers::button::{ButtonRecognizer, ButtonTiming};
use servo_router::drivers::hw_init;
use servo_router::drivers::hw_timer::EspOneShot;
use servo_router::drivers::indicator::{Indicator, IndicatorPattern};
use servo_router::drivers::led_strip::{self, Ws2812};
use servo_router::drivers::task_pin::{priority, spawn_task};
use servo_router::error::{Error, PeripheralError};
use servo_router::pins;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("servo-router v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let state: &'static SharedState = Box::leak(Box::new(SharedState::new()));

    // ── 2. NVS + config ───────────────────────────────────────
    let nvs = match NvsAdapter::new() {
        Ok(nvs) => nvs,
        // No config yet: show the halt on the default LED line.
        Err(e) => fatal(
            Error::from(e),
            open_pixel(peripherals.rmt.channel0, pins::LED_GPIO).ok(),
        ),
    };
    let config = config::load_or(&nvs, DeviceConfig::default(), &mut LogEventSink);
    info!(
        "Config: rest={}° target={}° auto-return={} ms ep={}",
        config.rest_angle_deg, config.target_angle_deg, config.auto_return_delay_ms, config.endpoint_id
    );

    // ── 3. Peripherals ────────────────────────────────────────
    let pixel = match open_pixel(peripherals.rmt.channel0, config.led_gpio) {
        Ok(pixel) => pixel,
        Err(e) => fatal(Error::from(e), None),
    };
    let pwm = match hw_init::init_servo_pwm(config.servo_gpio, config.pwm_frequency_hz) {
        Ok(pwm) => pwm,
        Err(e) => fatal(Error::from(e), Some(pixel)),
    };
    let timer = match EspOneShot::new() {
        Ok(timer) => timer,
        Err(e) => fatal(Error::from(e), Some(pixel)),
    };
    let button_pin = match hw_init::init_button(config.button_gpio) {
        Ok(pin) => pin,
        Err(e) => fatal(Error::from(e), Some(pixel)),
    };

    // Servo goes to rest before anything can command it.
    let mut actuator = ActuatorService::new(
        ActuatorStateMachine::new(pwm, timer, ActuatorSettings::from(&config)),
        &state.position,
    );
    actuator.home();

    // ── 4. Tasks ──────────────────────────────────────────────
    spawn_task(priority::INDICATOR, 4, "indicator\0", move || {
        let mut indicator = Indicator::new(pixel);
        loop {
            indicator.tick(IndicatorPattern::observe(state));
            FreeRtos::delay_ms(pins::INDICATOR_TICK_MS);
        }
    })
    .map_err(Error::from)?;

    let endpoint = config.endpoint_id;
    spawn_task(priority::ACTUATOR, 6, "actuator\0", move || {
        let mut sink = (
            LogEventSink,
            AttributeReporter::new(ZigbeeMesh, &state.commissioning, endpoint),
        );
        futures_lite::future::block_on(actuator.run(&INTENTS, &mut sink));
    })
    .map_err(Error::from)?;

    let timing = ButtonTiming::from(&config);
    spawn_task(priority::BUTTON, 4, "button\0", move || {
        let mut recognizer =
            ButtonRecognizer::new(button_pin, FreeRtos, Esp32TimeAdapter::new(), &state.button, timing);
        let mut mesh = ZigbeeMesh;
        loop {
            if let Some(event) = recognizer.poll() {
                let outcome = commands::dispatch(event, &INTENTS, &mut mesh, &mut LogEventSink);
                if outcome == Dispatched::ResetRefused {
                    recognizer.rearm();
                }
            }
            FreeRtos::delay_ms(pins::BUTTON_POLL_MS);
        }
    })
    .map_err(Error::from)?;

    let zb_config = config.clone();
    let zigbee_task = spawn_task(priority::ZIGBEE, 8, "zigbee\0", move || {
        if let Err(e) = zigbee::run(&zb_config, state) {
            error!("{}", Error::from(e));
        }
    })
    .map_err(Error::from)?;

    info!("System ready.");

    // Only returns if the stack failed to start; the indicator shows it.
    if zigbee_task.join().is_err() {
        error!("Zigbee task panicked");
    }
    loop {
        FreeRtos::delay_ms(1000);
    }
}

/// The status pixel on RMT channel 0.
fn open_pixel(channel: CHANNEL0, gpio: i32) -> Result<Ws2812, PeripheralError> {
    // SAFETY: the LED line is not claimed by any other driver, and `gpio`
    // is either the board default or passed DeviceConfig::validate.
    let pin = unsafe { AnyOutputPin::new(gpio) };
    led_strip::open_ws2812(channel, pin)
}

/// Log `e` and halt. Every boot failure ends here.
fn fatal(e: Error, pixel: Option<Ws2812>) -> ! {
    error!("{}", e);
    halt(pixel)
}

/// Show RedBlink forever.
fn halt(pixel: Option<Ws2812>) -> ! {
    error!("Halted.");
    let Some(pixel) = pixel else {
        loop {
            FreeRtos::delay_ms(1000);
        }
    };
    let mut indicator = Indicator::new(pixel);
    loop {
        indicator.tick(IndicatorPattern::RedBlink);
        FreeRtos::delay_ms(pins::INDICATOR_TICK_MS);
    }
}
