use bytes::BufMut;
use uuid::Uuid;

use crate::error::DecodeError;
use crate::types::{NodeId, PayloadType, DEFAULT_HOP_LIMIT, PROTOCOL_VERSION};
use crate::wire::{self, Reader, UUID_LEN};

/// Mesh message: the unit of transport across every link layer.
///
/// Wire layout (little-endian, identifiers byte-reversed):
///
/// ```text
/// version (1) || identifier (16) || source (16) || destination (16)
/// || hop_limit (1) || payload_type (1) || payload (..)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Unique per packet instance. Used for duplicate suppression.
    pub identifier: Uuid,
    /// Originating node.
    pub source: NodeId,
    /// Final recipient.
    pub destination: NodeId,
    /// Remaining hops. Decremented by every forwarding node.
    pub hop_limit: u8,
    /// Controller that owns `payload`.
    pub payload_type: PayloadType,
    /// Opaque bytes, meaningful only to the owning controller.
    pub payload: Vec<u8>,
}

impl Message {
    /// Length of everything before the payload.
    pub const HEADER_LEN: usize = 1 + UUID_LEN * 3 + 1 + 1;

    /// Create a message with a fresh identifier and the default hop limit.
    pub fn new(
        source: NodeId,
        destination: NodeId,
        payload_type: PayloadType,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            identifier: Uuid::new_v4(),
            source,
            destination,
            hop_limit: DEFAULT_HOP_LIMIT,
            payload_type,
            payload,
        }
    }

    /// Set the hop limit.
    pub fn with_hop_limit(mut self, hop_limit: u8) -> Self {
        self.hop_limit = hop_limit;
        self
    }

    /// Encoded length in bytes.
    pub fn encoded_len(&self) -> usize {
        Self::HEADER_LEN + self.payload.len()
    }

    /// Append the wire encoding to `buf`.
    pub fn encode_into(&self, buf: &mut impl BufMut) {
        buf.put_u8(PROTOCOL_VERSION);
        wire::put_uuid(buf, &self.identifier);
        wire::put_node_id(buf, &self.source);
        wire::put_node_id(buf, &self.destination);
        buf.put_u8(self.hop_limit);
        buf.put_u8(self.payload_type.0);
        buf.put_slice(&self.payload);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf
    }

    /// Decode a complete message. The payload is whatever follows the header.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < Self::HEADER_LEN {
            return Err(DecodeError::Truncated {
                needed: Self::HEADER_LEN,
                remaining: data.len(),
            });
        }

        let mut reader = Reader::new(data);
        let version = reader.read_u8()?;
        if version != PROTOCOL_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }

        Ok(Self {
            identifier: reader.read_uuid()?,
            source: reader.read_node_id()?,
            destination: reader.read_node_id()?,
            hop_limit: reader.read_u8()?,
            payload_type: PayloadType(reader.read_u8()?),
            payload: reader.read_rest(),
        })
    }
}
