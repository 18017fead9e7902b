//! Protocol controllers, each the owner of one payload type.
//!
//! The [`Mesh`](crate::Mesh) owns its controllers; a controller reaches back
//! into the mesh only through the [`ControllerDelegate`] it was built with.
mod control;
mod pending;

use std::collections::BTreeSet;

use crate::error::MeshError;
use crate::message::Message;
use crate::types::{LinkLayer, NodeId, PayloadType};

pub use control::ControlMessageController;

/// Handler for every message addressed to this node with a given payload type.
pub trait ProtocolController: Send + Sync {
    /// Payload type this controller decodes.
    fn payload_type(&self) -> PayloadType;

    /// Address of the node the controller runs on.
    fn node(&self) -> NodeId;

    /// Called by the mesh, inline on the receiving transport's worker.
    fn did_receive_message(&self, message: Message);
}

/// What a controller may ask of the mesh that owns it.
pub trait ControllerDelegate: Send + Sync {
    /// Transmit an originated message on every attached link.
    fn request_transmit(&self, message: Message) -> Result<(), MeshError>;

    /// Link layers currently attached to the mesh.
    fn available_link_layers(&self) -> BTreeSet<LinkLayer>;
}
