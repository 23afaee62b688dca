//! Servo, button and indicator drivers, hardware initialisation, and
//! peripheral helpers.

pub mod button;
pub mod hw_init;
pub mod hw_timer;
pub mod indicator;
pub mod led_strip;
pub mod servo;
pub mod task_pin;
