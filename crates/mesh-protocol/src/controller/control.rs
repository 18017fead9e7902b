use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::control::{ControlMessage, ControlMessageType};
use crate::error::MeshError;
use crate::message::Message;
use crate::types::{LinkLayer, NodeId, PayloadType};

use super::pending::PendingRequests;
use super::{ControllerDelegate, ProtocolController};

/// Reference controller for the control message protocol.
///
/// Answers echo, path and link-layer requests addressed to this node, and
/// issues its own requests with response correlation and timeout.
pub struct ControlMessageController {
    node: NodeId,
    hop_limit: u8,
    delegate: Arc<dyn ControllerDelegate>,
    pending: Mutex<PendingRequests>,
}

impl ControlMessageController {
    pub fn new(node: NodeId, hop_limit: u8, delegate: Arc<dyn ControllerDelegate>) -> Self {
        Self {
            node,
            hop_limit,
            delegate,
            pending: Mutex::new(PendingRequests::default()),
        }
    }

    /// Ping `destination`. Returns the round-trip time.
    pub async fn echo(&self, destination: NodeId, timeout: Duration) -> Result<Duration, MeshError> {
        let started = Instant::now();
        self.request(
            destination,
            ControlMessage::EchoRequest,
            ControlMessageType::EchoResponse,
            self.hop_limit,
            timeout,
        )
        .await?;
        Ok(started.elapsed())
    }

    /// Probe how many hops separate this node from `destination`.
    ///
    /// The request travels with `hop_budget` as its hop limit, so it dies
    /// if the destination is further than that.
    pub async fn path(
        &self,
        destination: NodeId,
        hop_budget: u8,
        timeout: Duration,
    ) -> Result<u8, MeshError> {
        let response = self
            .request(
                destination,
                ControlMessage::PathRequest(hop_budget),
                ControlMessageType::PathResponse,
                hop_budget,
                timeout,
            )
            .await?;
        match response {
            ControlMessage::PathResponse(hops) => Ok(hops),
            other => unexpected_response(ControlMessageType::PathResponse, other),
        }
    }

    /// Ask `destination` which link layers it has attached.
    pub async fn link_layers(
        &self,
        destination: NodeId,
        timeout: Duration,
    ) -> Result<BTreeSet<LinkLayer>, MeshError> {
        let response = self
            .request(
                destination,
                ControlMessage::LinkLayerRequest,
                ControlMessageType::LinkLayerResponse,
                self.hop_limit,
                timeout,
            )
            .await?;
        match response {
            ControlMessage::LinkLayerResponse(layers) => Ok(layers),
            other => unexpected_response(ControlMessageType::LinkLayerResponse, other),
        }
    }

    /// Number of requests currently awaiting a response.
    pub fn pending_requests(&self) -> usize {
        self.pending().len()
    }

    async fn request(
        &self,
        destination: NodeId,
        request: ControlMessage,
        response: ControlMessageType,
        hop_limit: u8,
        timeout: Duration,
    ) -> Result<ControlMessage, MeshError> {
        // Register before sending: a response can arrive inline with the send.
        let (id, rx) = self.pending().register(destination, response)?;

        let message = Message::new(
            self.node,
            destination,
            ControlMessage::PAYLOAD_TYPE,
            request.to_bytes(),
        )
        .with_hop_limit(hop_limit);

        tracing::debug!(
            "sending {:?} to {destination} ({})",
            request.message_type(),
            message.identifier
        );
        if let Err(e) = self.delegate.request_transmit(message) {
            self.pending().cancel(id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(message)) => Ok(message),
            Ok(Err(_)) => Err(MeshError::Shutdown),
            Err(_) => {
                self.pending().cancel(id);
                Err(MeshError::Timeout {
                    destination,
                    response,
                    after: timeout,
                })
            }
        }
    }

    fn reply(&self, to: NodeId, response: ControlMessage) {
        let message = Message::new(
            self.node,
            to,
            ControlMessage::PAYLOAD_TYPE,
            response.to_bytes(),
        )
        .with_hop_limit(self.hop_limit);

        if let Err(e) = self.delegate.request_transmit(message) {
            tracing::warn!("could not send {:?} to {to}: {e}", response.message_type());
        }
    }

    fn pending(&self) -> MutexGuard<'_, PendingRequests> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProtocolController for ControlMessageController {
    fn payload_type(&self) -> PayloadType {
        ControlMessage::PAYLOAD_TYPE
    }

    fn node(&self) -> NodeId {
        self.node
    }

    fn did_receive_message(&self, message: Message) {
        let control = match ControlMessage::from_bytes(&message.payload) {
            Ok(control) => control,
            Err(e) => {
                tracing::warn!("bad control message from {}: {e}", message.source);
                return;
            }
        };

        match control {
            ControlMessage::EchoRequest => {
                self.reply(message.source, ControlMessage::EchoResponse);
            }
            ControlMessage::PathRequest(hop_budget) => {
                let hops = hop_budget.saturating_sub(message.hop_limit);
                self.reply(message.source, ControlMessage::PathResponse(hops));
            }
            ControlMessage::LinkLayerRequest => {
                let layers = self.delegate.available_link_layers();
                self.reply(message.source, ControlMessage::LinkLayerResponse(layers));
            }
            response @ (ControlMessage::EchoResponse
            | ControlMessage::PathResponse(_)
            | ControlMessage::LinkLayerResponse(_)) => {
                let response_type = response.message_type();
                match self.pending().resolve(message.source, response) {
                    Some(elapsed) => tracing::debug!(
                        "{response_type:?} from {} after {elapsed:?}",
                        message.source
                    ),
                    None => tracing::warn!(
                        "unmatched {response_type:?} from {}",
                        message.source
                    ),
                }
            }
        }
    }
}

impl std::fmt::Debug for ControlMessageController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlMessageController")
            .field("node", &self.node)
            .field("hop_limit", &self.hop_limit)
            .finish()
    }
}

/// Pending requests are keyed by response type, so this only fires if that
/// pairing is broken.
fn unexpected_response<T>(
    expected: ControlMessageType,
    message: ControlMessage,
) -> Result<T, MeshError> {
    let actual = message.message_type();
    tracing::warn!("request awaiting {expected:?} resolved with {actual:?}");
    Err(MeshError::UnexpectedResponse { expected, actual })
}
