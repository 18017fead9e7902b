use std::time::Duration;

use crate::control::ControlMessageType;
use crate::types::NodeId;

/// Wire decoding failures.
///
/// Always non-fatal: the receiving side logs (or, for a version mismatch,
/// silently ignores) the bytes and moves on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown {kind} type {value}")]
    UnknownType { kind: &'static str, value: u8 },

    #[error("invalid {kind} length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("reserved flag bits set: {0:#04x}")]
    ReservedFlags(u8),
}

/// Failures reported by a link-layer transport.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("outbound queue is full ({capacity} frames)")]
    QueueFull { capacity: usize },

    #[error("link is closed")]
    Closed,

    #[error("frame too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("radio error: {0}")]
    Radio(String),
}

/// Mesh-level errors surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("link error: {0}")]
    Link(#[from] LinkError),

    #[error("no {response:?} from {destination} within {after:?}")]
    Timeout {
        destination: NodeId,
        response: ControlMessageType,
        after: Duration,
    },

    #[error("a request awaiting {response:?} from {destination} is already in flight")]
    RequestInFlight {
        destination: NodeId,
        response: ControlMessageType,
    },

    #[error("expected {expected:?}, got {actual:?}")]
    UnexpectedResponse {
        expected: ControlMessageType,
        actual: ControlMessageType,
    },

    #[error("mesh has shut down")]
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_truncated() {
        let err = DecodeError::Truncated {
            needed: 51,
            remaining: 3,
        };
        assert_eq!(
            err.to_string(),
            "truncated input: needed 51 bytes, 3 remaining"
        );
    }

    #[test]
    fn test_display_unknown_type() {
        let err = DecodeError::UnknownType {
            kind: "control message",
            value: 9,
        };
        assert_eq!(err.to_string(), "unknown control message type 9");
    }

    #[test]
    fn test_display_reserved_flags() {
        let err = DecodeError::ReservedFlags(0x82);
        assert_eq!(err.to_string(), "reserved flag bits set: 0x82");
    }

    #[test]
    fn test_display_queue_full() {
        let err = LinkError::QueueFull { capacity: 64 };
        assert_eq!(err.to_string(), "outbound queue is full (64 frames)");
    }

    #[test]
    fn test_display_too_large() {
        let err = LinkError::TooLarge {
            size: 70_000,
            max: 65_507,
        };
        assert_eq!(err.to_string(), "frame too large: 70000 bytes (max 65507)");
    }

    #[test]
    fn test_decode_error_converts_into_mesh_error() {
        let err: MeshError = DecodeError::UnsupportedVersion(2).into();
        assert!(matches!(
            err,
            MeshError::Decode(DecodeError::UnsupportedVersion(2))
        ));
        assert_eq!(
            err.to_string(),
            "decode error: unsupported protocol version 2"
        );
    }

    #[test]
    fn test_display_unexpected_response() {
        let err = MeshError::UnexpectedResponse {
            expected: ControlMessageType::PathResponse,
            actual: ControlMessageType::EchoResponse,
        };
        assert_eq!(err.to_string(), "expected PathResponse, got EchoResponse");
    }
}
