//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a subsystem against mock
//! adapters. All tests run on the host with no real hardware required.

mod actuator_tests;
mod network_tests;
mod rig;
mod scenario_tests;
