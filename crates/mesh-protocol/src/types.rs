use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope version written by this implementation.
pub const PROTOCOL_VERSION: u8 = 1;

/// Hop limit given to originated messages unless configured otherwise.
pub const DEFAULT_HOP_LIMIT: u8 = u8::MAX;

/// Mesh node address, a 128-bit identifier.
///
/// Displayed and parsed in canonical hyphenated UUID form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generate a fresh random address.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Canonical (big-endian) numeric value.
    pub fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }
}

impl From<Uuid> for NodeId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0.hyphenated())
    }
}

impl FromStr for NodeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Selects the protocol controller that owns a message's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadType(pub u8);

impl PayloadType {
    /// Mesh control message protocol (echo, path, link-layer probes).
    pub const CONTROL_MESSAGE: PayloadType = PayloadType(0);

    /// Mesh transmission control protocol.
    pub const TRANSMISSION_CONTROL: PayloadType = PayloadType(1);
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Physical or transport technology a mesh packet can travel over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum LinkLayer {
    /// Bluetooth LE / GATT.
    ShortRangeWireless = 1,
    /// LoRa-class radio.
    LongRangeRadio = 2,
    /// Ethernet, WiFi, cellular.
    Ip = 3,
}

impl LinkLayer {
    pub const ALL: [LinkLayer; 3] = [
        LinkLayer::ShortRangeWireless,
        LinkLayer::LongRangeRadio,
        LinkLayer::Ip,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(LinkLayer::ShortRangeWireless),
            2 => Some(LinkLayer::LongRangeRadio),
            3 => Some(LinkLayer::Ip),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Nominal largest payload in bytes. Advertised only; never enforced.
    pub fn max_payload_hint(self) -> usize {
        match self {
            LinkLayer::ShortRangeWireless => 512,
            LinkLayer::LongRangeRadio => 255,
            LinkLayer::Ip => 65_507,
        }
    }
}

impl fmt::Display for LinkLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkLayer::ShortRangeWireless => "short-range-wireless",
            LinkLayer::LongRangeRadio => "long-range-radio",
            LinkLayer::Ip => "ip",
        };
        f.write_str(name)
    }
}
