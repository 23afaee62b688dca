//! Fuzz target: `ButtonRecognizer::poll`
//!
//! Treats each input byte as one 20 ms poll: the low bit is the line level,
//! the remaining bits add jitter to the cadence. Asserts that the
//! recognizer never panics, never reports both releases for one press, and
//! stays silent once a long release has latched it.
//!
//! cargo fuzz run fuzz_button_recognizer

#![no_main]

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin};
use libfuzzer_sys::fuzz_target;
use servo_router::app::ports::Clock;
use servo_router::app::state::ButtonPhaseCell;
use servo_router::drivers::button::{ButtonEvent, ButtonRecognizer, ButtonTiming};

#[derive(Clone, Default)]
struct Time(Rc<Cell<u64>>);

impl Clock for Time {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

impl DelayNs for Time {
    fn delay_ns(&mut self, ns: u32) {
        self.0.set(self.0.get() + u64::from(ns) / 1_000_000);
    }
}

/// Line level shared with the driver loop; `true` means pressed.
#[derive(Clone, Default)]
struct Level(Rc<Cell<bool>>);

impl ErrorType for Level {
    type Error = Infallible;
}

impl InputPin for Level {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.get())
    }
    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.get())
    }
}

fuzz_target!(|data: &[u8]| {
    let time = Time::default();
    let level = Level::default();
    let cell = ButtonPhaseCell::new();
    let timing = ButtonTiming {
        debounce_ms: 50,
        long_press_ms: 3000,
    };
    let mut rec = ButtonRecognizer::new(level.clone(), time.clone(), time.clone(), &cell, timing);

    let mut armed = false;
    let mut latched = false;
    for &byte in data {
        level.0.set(byte & 1 == 1);
        match rec.poll() {
            Some(ButtonEvent::LongPressArmed) => {
                assert!(!armed && !latched);
                armed = true;
            }
            Some(ButtonEvent::ShortRelease) => assert!(!armed && !latched),
            Some(ButtonEvent::LongRelease) => {
                assert!(armed && !latched);
                armed = false;
                latched = true;
            }
            None => {}
        }
        time.0.set(time.0.get() + 20 + u64::from(byte >> 1) * 10);
    }
});
