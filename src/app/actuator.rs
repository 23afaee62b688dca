//! Actuator state machine: the servo position and its auto-return timer.
//!
//! Position and timer change together: the timer is armed exactly while the
//! servo sits at Target. Every arming gets a fresh token, and an expiry only
//! counts if it carries the token of the arming still in force. An expiry
//! that raced a stop or a re-arm is therefore dropped instead of yanking a
//! freshly played servo back to rest.

use log::debug;

use crate::app::ports::{OneShotTimer, PwmPort};
use crate::config::DeviceConfig;
use crate::drivers::servo::{DutyRange, ServoDriver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServoPosition {
    Rest = 0,
    Target = 1,
}

impl ServoPosition {
    /// The on/off attribute value this position corresponds to.
    pub fn is_on(self) -> bool {
        self == Self::Target
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCommand {
    Play,
    Rest,
    Toggle,
}

/// Who asked for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    Button,
    Remote,
    /// Timer expiry for the arming identified by `token`.
    AutoReturn { token: u32 },
}

impl CommandSource {
    pub fn is_button(self) -> bool {
        self == Self::Button
    }

    pub fn is_remote(self) -> bool {
        self == Self::Remote
    }
}

/// A command queued for the actuator owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intent {
    pub command: ActuatorCommand,
    pub source: CommandSource,
}

impl Intent {
    pub const fn new(command: ActuatorCommand, source: CommandSource) -> Self {
        Self { command, source }
    }

    pub const fn button_toggle() -> Self {
        Self::new(ActuatorCommand::Toggle, CommandSource::Button)
    }

    pub const fn remote(command: ActuatorCommand) -> Self {
        Self::new(command, CommandSource::Remote)
    }

    pub const fn auto_return(token: u32) -> Self {
        Self::new(ActuatorCommand::Rest, CommandSource::AutoReturn { token })
    }
}

/// Result of a handled intent. `from` may equal `to` (play while at Target).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ServoPosition,
    pub to: ServoPosition,
    pub source: CommandSource,
}

/// Travel and timing taken from [`DeviceConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorSettings {
    pub rest_angle_deg: u8,
    pub target_angle_deg: u8,
    pub auto_return_delay_ms: u32,
    pub duty: DutyRange,
}

impl From<&DeviceConfig> for ActuatorSettings {
    fn from(c: &DeviceConfig) -> Self {
        Self {
            rest_angle_deg: c.rest_angle_deg,
            target_angle_deg: c.target_angle_deg,
            auto_return_delay_ms: c.auto_return_delay_ms,
            duty: DutyRange {
                at_0_deg: c.duty_at_0_deg,
                at_180_deg: c.duty_at_180_deg,
            },
        }
    }
}

pub struct ActuatorStateMachine<P: PwmPort, T: OneShotTimer> {
    servo: ServoDriver<P>,
    timer: T,
    settings: ActuatorSettings,
    position: ServoPosition,
    armed: Option<u32>,
    next_token: u32,
}

impl<P: PwmPort, T: OneShotTimer> ActuatorStateMachine<P, T> {
    /// Builds the machine at Rest. Nothing is driven until [`home`](Self::home).
    pub fn new(pwm: P, timer: T, settings: ActuatorSettings) -> Self {
        Self {
            servo: ServoDriver::new(pwm, settings.duty),
            timer,
            settings,
            position: ServoPosition::Rest,
            armed: None,
            next_token: 1,
        }
    }

    /// Drive the servo to the rest angle once at boot.
    pub fn home(&mut self) {
        self.rest();
    }

    pub fn position(&self) -> ServoPosition {
        self.position
    }

    /// Token of the arming in force, if the timer is running.
    pub fn armed_token(&self) -> Option<u32> {
        self.armed
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn servo(&self) -> &ServoDriver<P> {
        &self.servo
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Execute one intent. `None` means it was a stale expiry and nothing
    /// happened.
    pub fn handle(&mut self, intent: Intent) -> Option<Transition> {
        if let CommandSource::AutoReturn { token } = intent.source {
            if self.armed != Some(token) {
                debug!("SERVO: stale auto-return token {} dropped", token);
                return None;
            }
        }

        let from = self.position;
        match intent.command {
            ActuatorCommand::Play => self.play(),
            ActuatorCommand::Rest => self.rest(),
            ActuatorCommand::Toggle => match self.position {
                ServoPosition::Target => self.rest(),
                ServoPosition::Rest => self.play(),
            },
        }
        Some(Transition {
            from,
            to: self.position,
            source: intent.source,
        })
    }

    fn play(&mut self) {
        self.timer.stop();
        self.position = ServoPosition::Target;
        self.servo.apply(self.settings.target_angle_deg);

        let token = self.next_token;
        self.next_token = self.next_token.wrapping_add(1);
        self.armed = Some(token);
        self.timer
            .start_once(self.settings.auto_return_delay_ms, token);
    }

    fn rest(&mut self) {
        self.timer.stop();
        self.armed = None;
        self.position = ServoPosition::Rest;
        self.servo.apply(self.settings.rest_angle_deg);
    }
}
