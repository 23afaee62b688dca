//! Zigbee Cluster Library constants and the device identity model.
//!
//! The node exposes exactly one Home Automation endpoint implementing the
//! "on/off light" device. Basic-cluster identity strings travel as ZCL
//! character strings: one leading length byte, no terminator.

use heapless::Vec;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Profile / device / cluster identifiers
// ---------------------------------------------------------------------------

/// Home Automation profile.
pub const PROFILE_HOME_AUTOMATION: u16 = 0x0104;
/// HA device id for an on/off light.
pub const DEVICE_ON_OFF_LIGHT: u16 = 0x0100;

pub const CLUSTER_BASIC: u16 = 0x0000;
pub const CLUSTER_IDENTIFY: u16 = 0x0003;
pub const CLUSTER_GROUPS: u16 = 0x0004;
pub const CLUSTER_SCENES: u16 = 0x0005;
pub const CLUSTER_ON_OFF: u16 = 0x0006;

/// On/off cluster: the boolean `OnOff` attribute.
pub const ATTR_ON_OFF: u16 = 0x0000;

/// ZCL data type tag for a boolean attribute value.
pub const TYPE_BOOL: u8 = 0x10;

/// Longest identity string the basic cluster accepts.
pub const MAX_ZCL_STRING: usize = 32;

/// A length-prefixed ZCL character string.
pub type ZclString = Vec<u8, { MAX_ZCL_STRING + 1 }>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZclError {
    /// The string is longer than [`MAX_ZCL_STRING`] bytes.
    StringTooLong(usize),
}

impl core::fmt::Display for ZclError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::StringTooLong(len) => {
                write!(f, "ZCL string of {} bytes exceeds {}", len, MAX_ZCL_STRING)
            }
        }
    }
}

/// Encode `s` as a ZCL character string.
pub fn encode_zcl_string(s: &str) -> Result<ZclString, ZclError> {
    let bytes = s.as_bytes();
    if bytes.len() > MAX_ZCL_STRING {
        return Err(ZclError::StringTooLong(bytes.len()));
    }
    let mut out = ZclString::new();
    // Capacity is MAX_ZCL_STRING + 1, checked above.
    let _ = out.push(bytes.len() as u8);
    let _ = out.extend_from_slice(bytes);
    Ok(out)
}

/// Decode a ZCL character string, returning the text payload.
///
/// Returns `None` if the length prefix runs past the buffer or the payload
/// is not UTF-8.
pub fn decode_zcl_string(raw: &[u8]) -> Option<&str> {
    let (&len, rest) = raw.split_first()?;
    let payload = rest.get(..len as usize)?;
    core::str::from_utf8(payload).ok()
}

// ---------------------------------------------------------------------------
// Channel mask
// ---------------------------------------------------------------------------

/// Primary channel set used when joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelMask {
    /// Every 2.4 GHz channel, 11 through 26.
    All,
    /// The channels Hue bridges form networks on: 11, 15, 20, 25.
    Hue,
}

impl ChannelMask {
    /// Bitmask with bit `n` set for channel `n`.
    pub const fn bits(self) -> u32 {
        match self {
            Self::All => 0x07FF_F800,
            Self::Hue => (1 << 11) | (1 << 15) | (1 << 20) | (1 << 25),
        }
    }

    pub fn contains(self, channel: u8) -> bool {
        channel < 32 && self.bits() & (1 << channel) != 0
    }
}

// ---------------------------------------------------------------------------
// Basic cluster
// ---------------------------------------------------------------------------

/// ZCL revision advertised in the basic cluster.
pub const ZCL_VERSION: u8 = 0x03;
/// Basic-cluster power source: mains, single phase.
pub const POWER_SOURCE_MAINS: u8 = 0x01;

/// Everything the basic cluster advertises, already encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicInfo {
    pub manufacturer_name: ZclString,
    pub model_identifier: ZclString,
    pub date_code: ZclString,
    pub zcl_version: u8,
    pub application_version: u8,
    pub stack_version: u8,
    pub hw_version: u8,
    pub power_source: u8,
}

impl BasicInfo {
    pub fn new(
        manufacturer_name: &str,
        model_identifier: &str,
        date_code: &str,
        application_version: u8,
        stack_version: u8,
        hw_version: u8,
    ) -> Result<Self, ZclError> {
        Ok(Self {
            manufacturer_name: encode_zcl_string(manufacturer_name)?,
            model_identifier: encode_zcl_string(model_identifier)?,
            date_code: encode_zcl_string(date_code)?,
            zcl_version: ZCL_VERSION,
            application_version,
            stack_version,
            hw_version,
            power_source: POWER_SOURCE_MAINS,
        })
    }
}

// ---------------------------------------------------------------------------
// Endpoint descriptor
// ---------------------------------------------------------------------------

/// Server clusters of the HA on/off light device.
pub const ON_OFF_LIGHT_SERVER_CLUSTERS: [u16; 5] = [
    CLUSTER_BASIC,
    CLUSTER_IDENTIFY,
    CLUSTER_GROUPS,
    CLUSTER_SCENES,
    CLUSTER_ON_OFF,
];

/// The single endpoint this node registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub endpoint: u8,
    pub profile_id: u16,
    pub device_id: u16,
    pub server_clusters: &'static [u16],
}

impl EndpointDescriptor {
    pub const fn on_off_light(endpoint: u8) -> Self {
        Self {
            endpoint,
            profile_id: PROFILE_HOME_AUTOMATION,
            device_id: DEVICE_ON_OFF_LIGHT,
            server_clusters: &ON_OFF_LIGHT_SERVER_CLUSTERS,
        }
    }

    pub fn serves(&self, cluster: u16) -> bool {
        self.server_clusters.contains(&cluster)
    }
}
