//! Application core: pure domain logic, zero I/O.
//!
//! The actuator state machine and its owner task, the commissioning state
//! machine, and the shared cells the tasks publish through. All interaction
//! with hardware and the Zigbee stack happens through the port traits in
//! [`ports`], so this layer runs unchanged in host tests.

pub mod actuator;
pub mod commands;
pub mod events;
pub mod network;
pub mod ports;
pub mod service;
pub mod state;
