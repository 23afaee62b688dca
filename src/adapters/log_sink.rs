//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production). The attribute
//! reporter implements the same trait and is chained after this one.

use log::{info, warn};

use crate::app::actuator::CommandSource;
use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::PositionChanged { from, to, source } => {
                let by = match source {
                    CommandSource::Button => "button",
                    CommandSource::Remote => "remote",
                    CommandSource::AutoReturn { .. } => "auto-return",
                };
                info!("SERVO | {:?} -> {:?} | by={}", from, to, by);
            }
            AppEvent::Button(ev) => {
                info!("BUTTON | {:?}", ev);
            }
            AppEvent::FactoryReset => {
                warn!("BUTTON | long release, factory reset");
            }
            AppEvent::FactoryResetRefused => {
                warn!("BUTTON | factory reset refused, stack not running");
            }
            AppEvent::CommissioningChanged { from, to } => {
                info!("ZB | {:?} -> {:?}", from, to);
            }
            AppEvent::Joined(n) => {
                info!(
                    "ZB | joined | pan=0x{:04x} short=0x{:04x} ch={}",
                    n.pan_id, n.short_address, n.channel
                );
            }
            AppEvent::SteeringRetry { attempt, code } => {
                info!("ZB | steering failed (rc=0x{:x}), retry #{} in 1 s", code, attempt);
            }
            AppEvent::StackFailed { code } => {
                warn!("ZB | stack failed (rc=0x{:x}), halting commissioning", code);
            }
            AppEvent::ConfigFallback(e) => {
                warn!("CONFIG | override rejected ({}), using defaults", e);
            }
        }
    }
}
