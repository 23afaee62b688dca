//! Polled, debounced button recognizer with short and long release.
//!
//! ## Hardware
//!
//! Active-low momentary switch with an external pull-up. The button task
//! calls [`ButtonRecognizer::poll`] every 20 ms. Level changes are confirmed
//! by sleeping one debounce window and resampling; chatter shorter than the
//! window is discarded.
//!
//! ## Gesture detection
//!
//! | Gesture       | Condition                               | Event            |
//! |---------------|-----------------------------------------|------------------|
//! | Short release | Released before the long-press time     | `ShortRelease`   |
//! | Long armed    | Still held after `long_press_ms`        | `LongPressArmed` |
//! | Long release  | Released after arming                   | `LongRelease`    |
//!
//! A press yields at most one release event. After a long release the
//! recognizer latches and ignores the line until reboot, since the factory
//! reset it triggers restarts the device.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use log::{debug, info};

use crate::app::ports::Clock;
use crate::app::state::ButtonPhaseCell;
use crate::config::DeviceConfig;

/// Button events emitted after gesture classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    ShortRelease,
    LongPressArmed,
    LongRelease,
}

/// Recognizer phase, published for the indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ButtonPhase {
    Idle = 0,
    /// Line went low; waiting out the debounce window.
    PressedUnconfirmed = 1,
    HeldShort = 2,
    HeldLongArmed = 3,
}

impl ButtonPhase {
    /// Unknown values read back as Idle.
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::PressedUnconfirmed,
            2 => Self::HeldShort,
            3 => Self::HeldLongArmed,
            _ => Self::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonTiming {
    pub debounce_ms: u32,
    pub long_press_ms: u32,
}

impl From<&DeviceConfig> for ButtonTiming {
    fn from(c: &DeviceConfig) -> Self {
        Self {
            debounce_ms: c.button_debounce_ms,
            long_press_ms: c.button_long_press_ms,
        }
    }
}

pub struct ButtonRecognizer<'a, P, D, C> {
    pin: P,
    delay: D,
    clock: C,
    cell: &'a ButtonPhaseCell,
    timing: ButtonTiming,
    phase: ButtonPhase,
    press_start_ms: u64,
    latched: bool,
}

impl<'a, P, D, C> ButtonRecognizer<'a, P, D, C>
where
    P: InputPin,
    D: DelayNs,
    C: Clock,
{
    pub fn new(pin: P, delay: D, clock: C, cell: &'a ButtonPhaseCell, timing: ButtonTiming) -> Self {
        cell.store(ButtonPhase::Idle);
        Self {
            pin,
            delay,
            clock,
            cell,
            timing,
            phase: ButtonPhase::Idle,
            press_start_ms: 0,
            latched: false,
        }
    }

    pub fn phase(&self) -> ButtonPhase {
        self.phase
    }

    /// Start of the confirmed press, while one is held.
    pub fn press_start_ms(&self) -> Option<u64> {
        match self.phase {
            ButtonPhase::HeldShort | ButtonPhase::HeldLongArmed => Some(self.press_start_ms),
            _ => None,
        }
    }

    /// Whether a long release has latched the recognizer.
    pub fn is_latched(&self) -> bool {
        self.latched
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Listen again after a long release whose reset did not happen.
    pub fn rearm(&mut self) {
        self.latched = false;
    }

    /// Sample the line once and advance the state machine.
    ///
    /// May block for one debounce window while confirming an edge.
    pub fn poll(&mut self) -> Option<ButtonEvent> {
        if self.latched {
            return None;
        }
        let pressed = self.is_pressed();

        match self.phase {
            ButtonPhase::Idle | ButtonPhase::PressedUnconfirmed => {
                if pressed {
                    self.set_phase(ButtonPhase::PressedUnconfirmed);
                    self.delay.delay_ms(self.timing.debounce_ms);
                    if self.is_pressed() {
                        self.press_start_ms = self.clock.now_ms();
                        self.set_phase(ButtonPhase::HeldShort);
                        debug!("BUTTON: press confirmed at {} ms", self.press_start_ms);
                    } else {
                        self.set_phase(ButtonPhase::Idle);
                    }
                }
                None
            }

            ButtonPhase::HeldShort => {
                if pressed {
                    let held = self.clock.now_ms().saturating_sub(self.press_start_ms);
                    if held > u64::from(self.timing.long_press_ms) {
                        self.set_phase(ButtonPhase::HeldLongArmed);
                        info!("BUTTON: long press armed after {} ms", held);
                        return Some(ButtonEvent::LongPressArmed);
                    }
                    None
                } else if self.confirm_release() {
                    self.set_phase(ButtonPhase::Idle);
                    Some(ButtonEvent::ShortRelease)
                } else {
                    None
                }
            }

            ButtonPhase::HeldLongArmed => {
                if !pressed && self.confirm_release() {
                    self.set_phase(ButtonPhase::Idle);
                    self.latched = true;
                    Some(ButtonEvent::LongRelease)
                } else {
                    None
                }
            }
        }
    }

    fn confirm_release(&mut self) -> bool {
        self.delay.delay_ms(self.timing.debounce_ms);
        !self.is_pressed()
    }

    fn is_pressed(&mut self) -> bool {
        // Active low. A read error counts as released.
        matches!(self.pin.is_low(), Ok(true))
    }

    fn set_phase(&mut self, phase: ButtonPhase) {
        self.phase = phase;
        self.cell.store(phase);
    }
}
