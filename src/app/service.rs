//! Actuator owner, the single consumer of every actuator intent.
//!
//! [`ActuatorService`] owns the state machine. Button, Zigbee and timer
//! tasks never touch it; they post [`Intent`]s into a bounded
//! `embassy-sync` channel and the owner handles them one at a time in
//! arrival order, so play, rest, toggle and expiry never interleave.
//!
//! ```text
//!  button task ──┐
//!  zigbee task ──┼──▶ IntentChannel ──▶ ActuatorService ──▶ EventSink
//!  esp_timer   ──┘                       (servo + timer)
//! ```
//!
//! Remote writes coalesce. The queue holds at most one remote entry, in
//! the place of the oldest unhandled write, and it resolves to the latest
//! value the hub wrote. A burst of hub writes therefore cannot fill the
//! queue, and the owner always ends on the hub's last word.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TryReceiveError};
use log::{info, warn};

use super::actuator::{ActuatorCommand, ActuatorStateMachine, Intent, Transition};
use super::events::AppEvent;
use super::ports::{EventSink, OneShotTimer, PwmPort};
use super::state::PositionCell;

/// Intents buffered ahead of the owner task.
pub const INTENT_DEPTH: usize = 8;

/// Bounded intent queue with a latest-value slot for remote writes.
pub struct IntentChannel {
    queue: Channel<CriticalSectionRawMutex, Intent, INTENT_DEPTH>,
    /// Newest remote command not yet taken. `Some` exactly while a remote
    /// entry sits in `queue`.
    remote: Mutex<CriticalSectionRawMutex, Cell<Option<ActuatorCommand>>>,
}

impl Default for IntentChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentChannel {
    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
            remote: Mutex::new(Cell::new(None)),
        }
    }

    fn try_send(&self, intent: Intent) -> bool {
        if !intent.source.is_remote() {
            return self.queue.try_send(intent).is_ok();
        }
        self.remote.lock(|slot| {
            if slot.replace(Some(intent.command)).is_some() {
                // Folded into the remote entry already queued.
                return true;
            }
            if self.queue.try_send(intent).is_ok() {
                true
            } else {
                slot.set(None);
                false
            }
        })
    }

    /// Wait for the next intent.
    pub async fn receive(&self) -> Intent {
        loop {
            let queued = self.queue.receive().await;
            if let Some(intent) = self.resolve(queued) {
                return intent;
            }
        }
    }

    /// Next intent if one is queued.
    pub fn try_receive(&self) -> Result<Intent, TryReceiveError> {
        loop {
            let queued = self.queue.try_receive()?;
            if let Some(intent) = self.resolve(queued) {
                return Ok(intent);
            }
        }
    }

    /// Intents waiting, a coalesced remote entry counting once.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// A queued remote entry carries the latest written value.
    fn resolve(&self, queued: Intent) -> Option<Intent> {
        if !queued.source.is_remote() {
            return Some(queued);
        }
        self.remote.lock(Cell::take).map(Intent::remote)
    }
}

/// Process-wide intent channel: every producer → actuator owner.
pub static INTENTS: IntentChannel = IntentChannel::new();

/// Queue `intent` without blocking. Producers run in callback context
/// (stack task, esp_timer task), so a full channel drops the intent.
/// Remote writes never hit that limit while a remote entry is pending.
pub fn post(channel: &IntentChannel, intent: Intent) -> bool {
    if channel.try_send(intent) {
        true
    } else {
        warn!("SERVO: intent channel full, dropped {:?}", intent);
        false
    }
}

// ───────────────────────────────────────────────────────────────
// ActuatorService
// ───────────────────────────────────────────────────────────────

pub struct ActuatorService<'a, P: PwmPort, T: OneShotTimer> {
    machine: ActuatorStateMachine<P, T>,
    position: &'a PositionCell,
    handled: u32,
}

impl<'a, P: PwmPort, T: OneShotTimer> ActuatorService<'a, P, T> {
    pub fn new(machine: ActuatorStateMachine<P, T>, position: &'a PositionCell) -> Self {
        Self {
            machine,
            position,
            handled: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive the servo to rest. Call once before the first intent.
    pub fn home(&mut self) {
        self.machine.home();
        self.position.store(self.machine.position());
        info!("SERVO: homed to rest");
    }

    /// Owner loop. Never returns.
    pub async fn run(&mut self, channel: &IntentChannel, sink: &mut impl EventSink) {
        loop {
            let intent = channel.receive().await;
            self.handle(intent, sink);
        }
    }

    // ── Intent handling ───────────────────────────────────────

    /// Handle one intent and publish the outcome.
    ///
    /// The position cell is updated before the sink sees the event, so a
    /// report triggered from the sink carries the committed position.
    pub fn handle(&mut self, intent: Intent, sink: &mut impl EventSink) -> Option<Transition> {
        let transition = self.machine.handle(intent)?;
        self.handled = self.handled.wrapping_add(1);
        self.position.store(transition.to);
        sink.emit(&AppEvent::PositionChanged {
            from: transition.from,
            to: transition.to,
            source: transition.source,
        });
        Some(transition)
    }

    /// Handle everything queued right now. Returns how many intents were
    /// taken off the channel, stale expiries included.
    pub fn drain(&mut self, channel: &IntentChannel, sink: &mut impl EventSink) -> usize {
        let mut n = 0;
        while let Ok(intent) = channel.try_receive() {
            self.handle(intent, sink);
            n += 1;
        }
        n
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn machine(&self) -> &ActuatorStateMachine<P, T> {
        &self.machine
    }

    /// Intents that changed (or re-asserted) the position.
    pub fn handled(&self) -> u32 {
        self.handled
    }
}
