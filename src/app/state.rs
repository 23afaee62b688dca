//! Single-word state cells shared between tasks.
//!
//! Each cell has exactly one writer; every other task only reads. Reads are
//! lock-free and may be one tick stale, which every reader tolerates.
//!
//! | Cell                 | Writer              | Readers                     |
//! |----------------------|---------------------|-----------------------------|
//! | `CommissioningCell`  | network agent       | indicator, attribute sync   |
//! | `ButtonPhaseCell`    | button recognizer   | indicator                   |
//! | `PositionCell`       | actuator owner task | logging, tests              |

use core::sync::atomic::{AtomicU8, Ordering};

use crate::app::actuator::ServoPosition;
use crate::app::network::CommissioningPhase;
use crate::drivers::button::ButtonPhase;

/// Published [`CommissioningPhase`].
pub struct CommissioningCell(AtomicU8);

impl CommissioningCell {
    pub const fn new(initial: CommissioningPhase) -> Self {
        Self(AtomicU8::new(initial as u8))
    }

    /// Decoded phase. `None` only if the cell holds a value no writer stores.
    pub fn load(&self) -> Option<CommissioningPhase> {
        CommissioningPhase::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, phase: CommissioningPhase) {
        self.0.store(phase as u8, Ordering::Release);
    }

    pub fn is_joined(&self) -> bool {
        self.load() == Some(CommissioningPhase::Joined)
    }
}

/// Published [`ButtonPhase`].
pub struct ButtonPhaseCell(AtomicU8);

impl ButtonPhaseCell {
    pub const fn new() -> Self {
        Self(AtomicU8::new(ButtonPhase::Idle as u8))
    }

    pub fn load(&self) -> ButtonPhase {
        ButtonPhase::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, phase: ButtonPhase) {
        self.0.store(phase as u8, Ordering::Release);
    }
}

impl Default for ButtonPhaseCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Published [`ServoPosition`].
pub struct PositionCell(AtomicU8);

impl PositionCell {
    pub const fn new() -> Self {
        Self(AtomicU8::new(ServoPosition::Rest as u8))
    }

    pub fn load(&self) -> ServoPosition {
        if self.0.load(Ordering::Acquire) == ServoPosition::Target as u8 {
            ServoPosition::Target
        } else {
            ServoPosition::Rest
        }
    }

    pub(crate) fn store(&self, position: ServoPosition) {
        self.0.store(position as u8, Ordering::Release);
    }
}

impl Default for PositionCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Boot-time root of the shared cells. Created once and handed to every
/// task by reference.
pub struct SharedState {
    pub commissioning: CommissioningCell,
    pub button: ButtonPhaseCell,
    pub position: PositionCell,
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            commissioning: CommissioningCell::new(CommissioningPhase::Initializing),
            button: ButtonPhaseCell::new(),
            position: PositionCell::new(),
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
