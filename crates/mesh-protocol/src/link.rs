use std::sync::Arc;

use crate::error::LinkError;
use crate::message::Message;
use crate::types::LinkLayer;

/// Callback a transport invokes for every decoded inbound message.
///
/// Runs on the transport's own worker, so it must not block.
pub type InboundHandler = Arc<dyn Fn(Message) + Send + Sync>;

/// Link-layer transport abstraction consumed by the [`Mesh`](crate::Mesh).
///
/// In production: implemented by the LoRa and UDP transports.
/// In tests: implemented by in-memory mock links.
pub trait LinkLayerTransport: Send + Sync {
    /// Technology this transport carries packets over.
    fn link_layer(&self) -> LinkLayer;

    /// Hand a message to the link for transmission.
    ///
    /// Implementations queue and return immediately; delivery is best effort.
    fn send(&self, message: &Message) -> Result<(), LinkError>;

    /// Install the inbound callback, replacing any previous one.
    fn set_inbound(&self, handler: InboundHandler);

    /// Whether one send reaches several neighbours that cannot hear each
    /// other directly, like a UDP socket with a peer list.
    ///
    /// The mesh forwards on a multipoint link even when the message arrived
    /// on it. The link must then leave out the neighbour it came from.
    fn is_multipoint(&self) -> bool {
        false
    }
}

/// Handle identifying a transport attached to a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub(crate) usize);

impl LinkId {
    pub fn index(&self) -> usize {
        self.0
    }
}
