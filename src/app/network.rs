//! Network agent: commissioning state machine and attribute contract.
//!
//! The agent is the sole writer of [`CommissioningPhase`]. It is driven by
//! stack signals, which the Zigbee stack delivers one at a time from its
//! own task, so the agent needs no locking of its own.
//!
//! ```text
//!   (start) ──skip-startup──▶ Initializing ──first-start/reboot ok──▶ Steering
//!                                 │  ▲                                 │  ▲
//!                  start error    │  │ leave           steering error  │  │ retry 1 s
//!                                 ▼  │                                 └──┘
//!                               Failed └────────── Joined ◀──steering ok──┘
//! ```
//!
//! Failed has no exit; the device must be power-cycled.

use log::{debug, info, warn};

use crate::app::actuator::ActuatorCommand;
use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, MeshPort};
use crate::app::state::CommissioningCell;
use crate::zcl;

/// Fixed steering retry interval. No backoff.
pub const STEERING_RETRY_MS: u32 = 1000;

// ───────────────────────────────────────────────────────────────
// Types
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommissioningPhase {
    Initializing = 0,
    Steering = 1,
    Joined = 2,
    Failed = 3,
}

impl CommissioningPhase {
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Initializing),
            1 => Some(Self::Steering),
            2 => Some(Self::Joined),
            3 => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Identifiers of the joined network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkInfo {
    pub pan_id: u16,
    pub short_address: u16,
    pub channel: u8,
}

/// BDB top-level commissioning mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommissioningMode {
    Initialization,
    NetworkSteering { touchlink: bool },
}

/// Stack signals the agent reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshSignal {
    SkipStartup,
    FirstStart,
    Reboot,
    SteeringComplete,
    Leave,
    CanSleep,
    /// Any other signal, carrying the stack's raw signal type.
    Other(u32),
}

/// Outcome attached to a signal: `Err` carries the stack's `esp_err_t`.
pub type SignalStatus = Result<(), i32>;

/// A remote write to a local attribute, as delivered by the stack.
#[derive(Debug, Clone, Copy)]
pub struct AttributeWrite<'a> {
    pub endpoint: u8,
    pub cluster: u16,
    pub attribute: u16,
    pub data_type: u8,
    pub value: &'a [u8],
}

// ───────────────────────────────────────────────────────────────
// NetworkAgent
// ───────────────────────────────────────────────────────────────

pub struct NetworkAgent<'a, M: MeshPort> {
    mesh: M,
    cell: &'a CommissioningCell,
    phase: CommissioningPhase,
    network: Option<NetworkInfo>,
    endpoint: u8,
    touchlink: bool,
    steering_retries: u32,
}

impl<'a, M: MeshPort> NetworkAgent<'a, M> {
    /// The agent starts in Initializing and publishes that immediately.
    pub fn new(mesh: M, cell: &'a CommissioningCell, endpoint: u8, touchlink: bool) -> Self {
        cell.store(CommissioningPhase::Initializing);
        Self {
            mesh,
            cell,
            phase: CommissioningPhase::Initializing,
            network: None,
            endpoint,
            touchlink,
            steering_retries: 0,
        }
    }

    pub fn phase(&self) -> CommissioningPhase {
        self.phase
    }

    /// Network identifiers, present only while Joined.
    pub fn network(&self) -> Option<NetworkInfo> {
        self.network
    }

    /// Steering retries scheduled since the last successful join.
    pub fn steering_retries(&self) -> u32 {
        self.steering_retries
    }

    pub fn mesh(&self) -> &M {
        &self.mesh
    }

    // ── Signals ───────────────────────────────────────────────

    /// Advance the commissioning state machine by one stack signal.
    pub fn handle_signal(
        &mut self,
        signal: MeshSignal,
        status: SignalStatus,
        sink: &mut impl EventSink,
    ) {
        if self.phase == CommissioningPhase::Failed {
            debug!("ZB: {:?} ignored, stack failed", signal);
            return;
        }

        match (self.phase, signal) {
            (_, MeshSignal::CanSleep) => {}

            (_, MeshSignal::SkipStartup) => {
                info!("ZB: stack initialised, starting initialization commissioning");
                self.enter(CommissioningPhase::Initializing, sink);
                self.mesh.begin_commissioning(CommissioningMode::Initialization);
            }

            (CommissioningPhase::Initializing, MeshSignal::FirstStart | MeshSignal::Reboot) => {
                match status {
                    Ok(()) => {
                        info!("ZB: {:?} ok, starting network steering", signal);
                        self.enter(CommissioningPhase::Steering, sink);
                        self.mesh.begin_commissioning(self.steering_mode());
                    }
                    Err(rc) => {
                        warn!("ZB: {:?} failed (rc=0x{:x})", signal, rc);
                        sink.emit(&AppEvent::StackFailed { code: rc });
                        self.enter(CommissioningPhase::Failed, sink);
                    }
                }
            }

            (CommissioningPhase::Steering, MeshSignal::SteeringComplete) => match status {
                Ok(()) => {
                    let info = self.mesh.network_info();
                    self.network = Some(info);
                    self.steering_retries = 0;
                    self.enter(CommissioningPhase::Joined, sink);
                    sink.emit(&AppEvent::Joined(info));
                }
                Err(rc) => {
                    self.steering_retries = self.steering_retries.saturating_add(1);
                    sink.emit(&AppEvent::SteeringRetry {
                        attempt: self.steering_retries,
                        code: rc,
                    });
                    self.mesh.schedule_steering_retry(STEERING_RETRY_MS);
                }
            },

            (CommissioningPhase::Joined, MeshSignal::Leave) => {
                info!("ZB: left network, back to commissioning");
                self.network = None;
                self.enter(CommissioningPhase::Initializing, sink);
                self.mesh.begin_commissioning(CommissioningMode::Initialization);
            }

            (phase, other) => {
                debug!("ZB: {:?} ({:?}) ignored in {:?}", other, status, phase);
            }
        }
    }

    /// The stack could not be started at all.
    pub fn stack_failed(&mut self, code: i32, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::StackFailed { code });
        self.enter(CommissioningPhase::Failed, sink);
    }

    /// Steering callback scheduled by [`MeshPort::schedule_steering_retry`].
    pub fn retry_steering(&mut self) {
        if self.phase == CommissioningPhase::Steering {
            self.mesh.begin_commissioning(self.steering_mode());
        }
    }

    // ── Attribute writes ──────────────────────────────────────

    /// Map a remote attribute write to an actuator command.
    ///
    /// Only a boolean write to the on/off attribute of the configured
    /// endpoint produces a command. Everything else is accepted and ignored.
    pub fn handle_attribute_write(&self, write: &AttributeWrite<'_>) -> Option<ActuatorCommand> {
        if write.endpoint != self.endpoint
            || write.cluster != zcl::CLUSTER_ON_OFF
            || write.attribute != zcl::ATTR_ON_OFF
            || write.data_type != zcl::TYPE_BOOL
        {
            debug!(
                "ZB: write ep={} cluster=0x{:04x} attr=0x{:04x} ignored",
                write.endpoint, write.cluster, write.attribute
            );
            return None;
        }
        let on = *write.value.first()? != 0;
        info!("ZB: remote on/off = {}", on);
        Some(if on { ActuatorCommand::Play } else { ActuatorCommand::Rest })
    }

    // ── Helpers ───────────────────────────────────────────────

    fn steering_mode(&self) -> CommissioningMode {
        CommissioningMode::NetworkSteering {
            touchlink: self.touchlink,
        }
    }

    fn enter(&mut self, to: CommissioningPhase, sink: &mut impl EventSink) {
        let from = self.phase;
        self.phase = to;
        self.cell.store(to);
        if from != to {
            sink.emit(&AppEvent::CommissioningChanged { from, to });
        }
    }
}

// ───────────────────────────────────────────────────────────────
// AttributeReporter
// ───────────────────────────────────────────────────────────────

/// Keeps the on/off attribute in step with locally caused position changes.
///
/// Button and auto-return changes update the local attribute so hub reads
/// stay truthful. Button changes are additionally reported, but only while
/// Joined. Remote changes need neither: the stack already holds the value.
pub struct AttributeReporter<'a, M: MeshPort> {
    mesh: M,
    cell: &'a CommissioningCell,
    endpoint: u8,
}

impl<'a, M: MeshPort> AttributeReporter<'a, M> {
    pub fn new(mesh: M, cell: &'a CommissioningCell, endpoint: u8) -> Self {
        Self {
            mesh,
            cell,
            endpoint,
        }
    }

    pub fn mesh(&self) -> &M {
        &self.mesh
    }
}

impl<M: MeshPort> EventSink for AttributeReporter<'_, M> {
    fn emit(&mut self, event: &AppEvent) {
        let AppEvent::PositionChanged { to, source, .. } = event else {
            return;
        };
        if source.is_remote() {
            return;
        }
        self.mesh.set_on_off(self.endpoint, to.is_on());
        if source.is_button() && self.cell.is_joined() {
            self.mesh.report_on_off(self.endpoint);
        }
    }
}
