//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                     |
//! |------------|--------------|---------------------------------|
//! | `log_sink` | EventSink    | Serial log output               |
//! | `nvs`      | ConfigPort   | NVS / in-memory store           |
//! | `time`     | Clock        | esp_timer monotonic counter     |
//! | `zigbee`   | MeshPort     | esp-zigbee-lib via `zb_bridge`  |

pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod zigbee;
