//! Button gestures → actions.
//!
//! The button task is the only place that interprets gestures. A short
//! release becomes an actuator intent, a long release resets the mesh. The
//! armed notification only changes the indicator, which reads the button
//! phase on its own.

use crate::app::actuator::Intent;
use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, MeshPort};
use crate::app::service::{self, IntentChannel};
use crate::drivers::button::ButtonEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    /// Post this intent to the actuator owner.
    Actuate(Intent),
    /// Erase network credentials and restart the stack.
    FactoryReset,
}

/// What the button task does after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Done,
    /// The stack refused the reset. Re-arm the recognizer.
    ResetRefused,
}

pub fn action_for(event: ButtonEvent) -> Option<ButtonAction> {
    match event {
        ButtonEvent::ShortRelease => Some(ButtonAction::Actuate(Intent::button_toggle())),
        ButtonEvent::LongRelease => Some(ButtonAction::FactoryReset),
        ButtonEvent::LongPressArmed => None,
    }
}

/// Publish `event` and carry out its action.
///
/// The reset event is emitted before the stack is told, since a reset
/// restarts the chip and nothing after it is guaranteed to run.
pub fn dispatch(
    event: ButtonEvent,
    channel: &IntentChannel,
    mesh: &mut impl MeshPort,
    sink: &mut impl EventSink,
) -> Dispatched {
    sink.emit(&AppEvent::Button(event));
    match action_for(event) {
        Some(ButtonAction::Actuate(intent)) => {
            service::post(channel, intent);
        }
        Some(ButtonAction::FactoryReset) => {
            sink.emit(&AppEvent::FactoryReset);
            if !mesh.factory_reset() {
                sink.emit(&AppEvent::FactoryResetRefused);
                return Dispatched::ResetRefused;
            }
        }
        None => {}
    }
    Dispatched::Done
}
