//! Status pixel pattern engine.
//!
//! Observes the published commissioning and button phases and renders one
//! colour per 100 ms tick. It never writes either phase.
//!
//! | Condition                     | Pattern    | Colour      |
//! |-------------------------------|------------|-------------|
//! | Button armed for long press   | BlueSolid  | (0, 0, 50)  |
//! | Initializing / Steering       | BlueBlink  | (0, 0, 50)  |
//! | Joined                        | GreenSolid | (0, 20, 0)  |
//! | Failed                        | RedBlink   | (20, 0, 0)  |
//! | otherwise                     | Off        | -           |
//!
//! Blue blink is lit on even ticks, red blink on one tick in five. The blink
//! counter only advances while a blink pattern is showing.

use log::warn;

use crate::app::network::CommissioningPhase;
use crate::app::ports::PixelPort;
use crate::app::state::SharedState;
use crate::drivers::button::ButtonPhase;

/// Colour as (R, G, B) tuple, each 0–255.
pub type Rgb = (u8, u8, u8);

pub const OFF: Rgb = (0, 0, 0);
pub const BLUE: Rgb = (0, 0, 50);
pub const GREEN: Rgb = (0, 20, 0);
pub const RED: Rgb = (20, 0, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorPattern {
    Off,
    BlueBlink,
    GreenSolid,
    RedBlink,
    BlueSolid,
}

impl IndicatorPattern {
    /// Pattern for the current phases. The button's armed state wins.
    pub fn derive(commissioning: Option<CommissioningPhase>, button: ButtonPhase) -> Self {
        if button == ButtonPhase::HeldLongArmed {
            return Self::BlueSolid;
        }
        match commissioning {
            Some(CommissioningPhase::Initializing | CommissioningPhase::Steering) => {
                Self::BlueBlink
            }
            Some(CommissioningPhase::Joined) => Self::GreenSolid,
            Some(CommissioningPhase::Failed) => Self::RedBlink,
            None => Self::Off,
        }
    }

    /// Read both cells and derive.
    pub fn observe(state: &SharedState) -> Self {
        Self::derive(state.commissioning.load(), state.button.load())
    }
}

pub struct Indicator<L: PixelPort> {
    pixel: L,
    tick: u32,
    failures: u32,
}

impl<L: PixelPort> Indicator<L> {
    pub fn new(pixel: L) -> Self {
        Self {
            pixel,
            tick: 0,
            failures: 0,
        }
    }

    /// Render one tick of `pattern` and return the colour shown.
    pub fn tick(&mut self, pattern: IndicatorPattern) -> Rgb {
        let colour = match pattern {
            IndicatorPattern::Off => OFF,
            IndicatorPattern::GreenSolid => GREEN,
            IndicatorPattern::BlueSolid => BLUE,
            IndicatorPattern::BlueBlink => self.blink(2, BLUE),
            IndicatorPattern::RedBlink => self.blink(5, RED),
        };
        self.show(colour);
        colour
    }

    /// Pixel writes that failed so far. Failures are logged and skipped.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn pixel(&self) -> &L {
        &self.pixel
    }

    fn blink(&mut self, period: u32, colour: Rgb) -> Rgb {
        let lit = self.tick % period == 0;
        self.tick = self.tick.wrapping_add(1);
        if lit { colour } else { OFF }
    }

    fn show(&mut self, (r, g, b): Rgb) {
        let res = self.pixel.set_pixel(r, g, b).and_then(|()| self.pixel.refresh());
        if let Err(e) = res {
            self.failures = self.failures.saturating_add(1);
            warn!("LED: {}", e);
        }
    }
}
