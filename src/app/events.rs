//! Outbound application events.
//!
//! The actuator owner, button task and network agent emit these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them: log a line, update the on/off attribute,
//! send a report.

use crate::app::actuator::{CommandSource, ServoPosition};
use crate::app::network::{CommissioningPhase, NetworkInfo};
use crate::app::ports::ConfigError;
use crate::drivers::button::ButtonEvent;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The actuator committed a position.
    PositionChanged {
        from: ServoPosition,
        to: ServoPosition,
        source: CommandSource,
    },

    /// The button recognizer classified a gesture.
    Button(ButtonEvent),

    /// A long release wiped the network credentials.
    FactoryReset,

    /// The stack refused the reset; the button listens again.
    FactoryResetRefused,

    /// The commissioning state machine moved.
    CommissioningChanged {
        from: CommissioningPhase,
        to: CommissioningPhase,
    },

    /// Steering succeeded; carries the joined network.
    Joined(NetworkInfo),

    /// Steering failed and another attempt is scheduled.
    SteeringRetry { attempt: u32, code: i32 },

    /// The stack could not start. Terminal.
    StackFailed { code: i32 },

    /// A stored configuration override was unusable; defaults are in force.
    ConfigFallback(ConfigError),
}
