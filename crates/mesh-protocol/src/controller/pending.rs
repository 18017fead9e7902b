use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use crate::control::{ControlMessage, ControlMessageType};
use crate::error::MeshError;
use crate::types::NodeId;

/// An outstanding request waiting for its response.
#[derive(Debug)]
struct PendingRequest {
    id: u64,
    destination: NodeId,
    response: ControlMessageType,
    created: Instant,
    reply: oneshot::Sender<ControlMessage>,
}

/// Outstanding requests keyed by (destination, expected response type).
///
/// At most one entry per key. Entries leave on resolution or on cancellation
/// by the timed-out caller.
#[derive(Debug, Default)]
pub(super) struct PendingRequests {
    next_id: u64,
    entries: Vec<PendingRequest>,
}

impl PendingRequests {
    /// Register a request. Fails if one with the same key is in flight.
    pub(super) fn register(
        &mut self,
        destination: NodeId,
        response: ControlMessageType,
    ) -> Result<(u64, oneshot::Receiver<ControlMessage>), MeshError> {
        // Callers that dropped their future leave a closed sender behind.
        self.entries.retain(|entry| !entry.reply.is_closed());

        if self
            .entries
            .iter()
            .any(|entry| entry.destination == destination && entry.response == response)
        {
            return Err(MeshError::RequestInFlight {
                destination,
                response,
            });
        }

        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        let (reply, rx) = oneshot::channel();
        self.entries.push(PendingRequest {
            id,
            destination,
            response,
            created: Instant::now(),
            reply,
        });
        Ok((id, rx))
    }

    /// Hand `message` to the request waiting on (`source`, its type).
    ///
    /// Returns how long the request was pending, or `None` if nothing matched.
    pub(super) fn resolve(&mut self, source: NodeId, message: ControlMessage) -> Option<Duration> {
        let response = message.message_type();
        let position = self
            .entries
            .iter()
            .position(|entry| entry.destination == source && entry.response == response)?;

        let entry = self.entries.swap_remove(position);
        let elapsed = entry.created.elapsed();
        if entry.reply.send(message).is_err() {
            tracing::debug!("{response:?} from {source} arrived after its caller gave up");
        }
        Some(elapsed)
    }

    /// Drop the request registered under `id`, if still present.
    pub(super) fn cancel(&mut self, id: u64) -> bool {
        match self.entries.iter().position(|entry| entry.id == id) {
            Some(position) => {
                self.entries.swap_remove(position);
                true
            }
            None => false,
        }
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_matches_destination_and_type() {
        let mut pending = PendingRequests::default();
        let peer = NodeId::from_u128(7);
        let (_, mut rx) = pending
            .register(peer, ControlMessageType::EchoResponse)
            .unwrap();

        // Wrong sender
        assert!(pending
            .resolve(NodeId::from_u128(8), ControlMessage::EchoResponse)
            .is_none());
        // Wrong type
        assert!(pending.resolve(peer, ControlMessage::PathResponse(1)).is_none());

        assert!(pending.resolve(peer, ControlMessage::EchoResponse).is_some());
        assert_eq!(rx.try_recv().unwrap(), ControlMessage::EchoResponse);
        assert_eq!(pending.len(), 0);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut pending = PendingRequests::default();
        let peer = NodeId::from_u128(7);
        let _first = pending
            .register(peer, ControlMessageType::EchoResponse)
            .unwrap();

        assert!(matches!(
            pending.register(peer, ControlMessageType::EchoResponse),
            Err(MeshError::RequestInFlight { .. })
        ));
        // Different type to the same peer is fine.
        assert!(pending
            .register(peer, ControlMessageType::PathResponse)
            .is_ok());
    }

    #[test]
    fn abandoned_requests_are_pruned() {
        let mut pending = PendingRequests::default();
        let peer = NodeId::from_u128(7);
        let (_, rx) = pending
            .register(peer, ControlMessageType::EchoResponse)
            .unwrap();
        drop(rx);

        assert!(pending
            .register(peer, ControlMessageType::EchoResponse)
            .is_ok());
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn cancel_removes_only_the_given_request() {
        let mut pending = PendingRequests::default();
        let (first, _rx1) = pending
            .register(NodeId::from_u128(1), ControlMessageType::EchoResponse)
            .unwrap();
        let (_second, _rx2) = pending
            .register(NodeId::from_u128(2), ControlMessageType::EchoResponse)
            .unwrap();

        assert!(pending.cancel(first));
        assert!(!pending.cancel(first));
        assert_eq!(pending.len(), 1);
    }
}
