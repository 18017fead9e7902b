//! Control message protocol (payload type 0).
//!
//! Encoded as a 1-byte type tag followed by variant bytes: nothing for
//! echo and capability requests, one byte for hop counts, one byte per
//! link layer for the capability response.
use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::DecodeError;
use crate::types::{LinkLayer, PayloadType};
use crate::wire::Reader;

/// Wire tag of a control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum ControlMessageType {
    EchoRequest = 0,
    EchoResponse = 1,
    PathRequest = 5,
    PathResponse = 6,
    LinkLayerRequest = 7,
    LinkLayerResponse = 8,
}

impl ControlMessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::EchoRequest),
            1 => Some(Self::EchoResponse),
            5 => Some(Self::PathRequest),
            6 => Some(Self::PathResponse),
            7 => Some(Self::LinkLayerRequest),
            8 => Some(Self::LinkLayerResponse),
            // 2..=4: legacy error / peer messages, retired
            _ => None,
        }
    }

    /// The response a request of this type expects. `None` for responses.
    pub fn expected_response(self) -> Option<Self> {
        match self {
            Self::EchoRequest => Some(Self::EchoResponse),
            Self::PathRequest => Some(Self::PathResponse),
            Self::LinkLayerRequest => Some(Self::LinkLayerResponse),
            Self::EchoResponse | Self::PathResponse | Self::LinkLayerResponse => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    EchoRequest,
    EchoResponse,
    /// Carries the hop limit the request was originated with.
    PathRequest(u8),
    /// Hops consumed between requester and responder.
    PathResponse(u8),
    LinkLayerRequest,
    LinkLayerResponse(BTreeSet<LinkLayer>),
}

impl ControlMessage {
    pub const PAYLOAD_TYPE: PayloadType = PayloadType::CONTROL_MESSAGE;

    pub fn message_type(&self) -> ControlMessageType {
        match self {
            Self::EchoRequest => ControlMessageType::EchoRequest,
            Self::EchoResponse => ControlMessageType::EchoResponse,
            Self::PathRequest(_) => ControlMessageType::PathRequest,
            Self::PathResponse(_) => ControlMessageType::PathResponse,
            Self::LinkLayerRequest => ControlMessageType::LinkLayerRequest,
            Self::LinkLayerResponse(_) => ControlMessageType::LinkLayerResponse,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![self.message_type() as u8];
        match self {
            Self::PathRequest(hops) | Self::PathResponse(hops) => buf.push(*hops),
            Self::LinkLayerResponse(layers) => buf.extend(layers.iter().map(|l| l.as_u8())),
            Self::EchoRequest | Self::EchoResponse | Self::LinkLayerRequest => {}
        }
        buf
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(data);
        let tag = reader.read_u8()?;
        let message_type = ControlMessageType::from_u8(tag).ok_or(DecodeError::UnknownType {
            kind: "control message",
            value: tag,
        })?;

        let message = match message_type {
            ControlMessageType::EchoRequest => Self::EchoRequest,
            ControlMessageType::EchoResponse => Self::EchoResponse,
            ControlMessageType::LinkLayerRequest => Self::LinkLayerRequest,
            ControlMessageType::PathRequest => Self::PathRequest(read_hops(&mut reader)?),
            ControlMessageType::PathResponse => Self::PathResponse(read_hops(&mut reader)?),
            ControlMessageType::LinkLayerResponse => {
                let mut layers = BTreeSet::new();
                while !reader.is_empty() {
                    let value = reader.read_u8()?;
                    let layer = LinkLayer::from_u8(value).ok_or(DecodeError::UnknownType {
                        kind: "link layer",
                        value,
                    })?;
                    layers.insert(layer);
                }
                return Ok(Self::LinkLayerResponse(layers));
            }
        };

        let expected = match message {
            Self::PathRequest(_) | Self::PathResponse(_) => 2,
            _ => 1,
        };
        reader.finish("control message", expected)?;
        Ok(message)
    }
}

fn read_hops(reader: &mut Reader<'_>) -> Result<u8, DecodeError> {
    reader.read_u8().map_err(|_| DecodeError::InvalidLength {
        kind: "control message",
        expected: 2,
        actual: 1,
    })
}
