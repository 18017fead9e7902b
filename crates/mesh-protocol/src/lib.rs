//! Mesh protocol layer.
//!
//! Wire format for the mesh envelope and its control messages, a flood
//! router with bounded duplicate suppression, and pluggable protocol
//! controllers keyed by payload type. Transports live in `mesh-transport`
//! and plug in through [`LinkLayerTransport`].
//!
//! Wire format: fixed little-endian binary, 51-byte envelope header.

pub mod config;
pub mod control;
pub mod controller;
pub mod dedup;
pub mod error;
pub mod link;
pub mod mesh;
pub mod message;
pub mod router;
pub mod types;
pub mod wire;

pub use config::MeshConfig;
pub use control::{ControlMessage, ControlMessageType};
pub use controller::{ControlMessageController, ControllerDelegate, ProtocolController};
pub use error::{DecodeError, LinkError, MeshError};
pub use link::{InboundHandler, LinkId, LinkLayerTransport};
pub use mesh::Mesh;
pub use message::Message;
pub use router::{RejectReason, Router, RoutingAction};
pub use types::{LinkLayer, NodeId, PayloadType, DEFAULT_HOP_LIMIT, PROTOCOL_VERSION};
