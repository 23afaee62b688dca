//! Hobby servo on one LEDC channel.
//!
//! The pulse width is expressed directly as a 13-bit LEDC duty. Angles map
//! linearly between two calibrated duty endpoints, so inverted servos are
//! handled by swapping the endpoints rather than the angles.

use crate::app::ports::PwmPort;

/// Calibrated duty values at the two ends of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyRange {
    pub at_0_deg: u16,
    pub at_180_deg: u16,
}

impl DutyRange {
    /// Duty for `angle_deg`, truncating toward zero.
    ///
    /// Angles above 180 are clamped; configuration validation keeps them
    /// out in practice.
    pub fn duty_for(self, angle_deg: u8) -> u32 {
        let angle = i32::from(angle_deg.min(180));
        let d0 = i32::from(self.at_0_deg);
        let d180 = i32::from(self.at_180_deg);
        let duty = d0 + angle * (d180 - d0) / 180;
        // Lies between d0 and d180, both non-negative.
        duty as u32
    }
}

pub struct ServoDriver<P: PwmPort> {
    pwm: P,
    range: DutyRange,
}

impl<P: PwmPort> ServoDriver<P> {
    pub fn new(pwm: P, range: DutyRange) -> Self {
        Self { pwm, range }
    }

    /// Drive the servo to `angle_deg`.
    ///
    /// # Panics
    ///
    /// If the PWM peripheral rejects the duty or the commit. The output
    /// would otherwise hold an unknown pulse width.
    pub fn apply(&mut self, angle_deg: u8) {
        let duty = self.range.duty_for(angle_deg);
        if let Err(e) = self.pwm.set_duty(duty) {
            panic!("servo: set_duty({}) failed: {}", duty, e);
        }
        if let Err(e) = self.pwm.commit() {
            panic!("servo: commit of duty {} failed: {}", duty, e);
        }
    }

    pub fn range(&self) -> DutyRange {
        self.range
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }
}
