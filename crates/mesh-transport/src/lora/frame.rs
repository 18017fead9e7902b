use bytes::BufMut;
use mesh_protocol::wire::{self, Reader, UUID_LEN};
use mesh_protocol::{DecodeError, Message, NodeId};

/// Advertisement flag: a location follows the flags byte.
pub const FLAG_LOCATION: u8 = 0x01;

/// Frame discriminator, first byte on the air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LoRaFrameType {
    Advertisement = 0,
    MeshPacket = 1,
}

impl LoRaFrameType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Advertisement),
            1 => Some(Self::MeshPacket),
            _ => None,
        }
    }
}

/// Geographic position, degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Beacon announcing a node's presence on the radio.
#[derive(Debug, Clone, PartialEq)]
pub struct LoRaAdvertisement {
    pub node: NodeId,
    pub location: Option<Location>,
}

impl LoRaAdvertisement {
    const BASE_LEN: usize = UUID_LEN + 1;
    const LOCATION_LEN: usize = 16;

    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            location: None,
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    fn encoded_len(&self) -> usize {
        match self.location {
            Some(_) => Self::BASE_LEN + Self::LOCATION_LEN,
            None => Self::BASE_LEN,
        }
    }

    fn encode_into(&self, buf: &mut impl BufMut) {
        wire::put_node_id(buf, &self.node);
        match self.location {
            Some(location) => {
                buf.put_u8(FLAG_LOCATION);
                buf.put_f64_le(location.latitude);
                buf.put_f64_le(location.longitude);
            }
            None => buf.put_u8(0),
        }
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let node = reader.read_node_id()?;
        let flags = reader.read_u8()?;
        if flags & !FLAG_LOCATION != 0 {
            return Err(DecodeError::ReservedFlags(flags));
        }

        let location = if flags & FLAG_LOCATION != 0 {
            Some(Location {
                latitude: reader.read_f64()?,
                longitude: reader.read_f64()?,
            })
        } else {
            None
        };

        let advertisement = Self { node, location };
        reader.finish("lora advertisement", advertisement.encoded_len())?;
        Ok(advertisement)
    }
}

/// One unit on the air: a type byte followed by its body.
///
/// ```text
/// 0x00 || node (16) || flags (1) || [latitude f64 || longitude f64]
/// 0x01 || mesh envelope
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum LoRaFrame {
    Advertisement(LoRaAdvertisement),
    MeshPacket(Message),
}

impl LoRaFrame {
    pub fn frame_type(&self) -> LoRaFrameType {
        match self {
            LoRaFrame::Advertisement(_) => LoRaFrameType::Advertisement,
            LoRaFrame::MeshPacket(_) => LoRaFrameType::MeshPacket,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let body_len = match self {
            LoRaFrame::Advertisement(advertisement) => advertisement.encoded_len(),
            LoRaFrame::MeshPacket(message) => message.encoded_len(),
        };
        let mut buf = Vec::with_capacity(1 + body_len);
        buf.put_u8(self.frame_type() as u8);
        match self {
            LoRaFrame::Advertisement(advertisement) => advertisement.encode_into(&mut buf),
            LoRaFrame::MeshPacket(message) => message.encode_into(&mut buf),
        }
        buf
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(data);
        let tag = reader.read_u8()?;
        match LoRaFrameType::from_u8(tag) {
            Some(LoRaFrameType::Advertisement) => {
                LoRaAdvertisement::decode(&mut reader).map(LoRaFrame::Advertisement)
            }
            Some(LoRaFrameType::MeshPacket) => {
                Message::from_bytes(&data[1..]).map(LoRaFrame::MeshPacket)
            }
            None => Err(DecodeError::UnknownType {
                kind: "lora frame",
                value: tag,
            }),
        }
    }
}
