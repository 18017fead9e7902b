//! Flood routing engine for the mesh.
//!
//! Pure decision logic: receives a message, returns a `RoutingAction`
//! telling the caller what to do (deliver, forward, reject, drop).
//! No I/O, no transport dependency.
use std::fmt;
use std::time::Duration;

use uuid::Uuid;

use crate::dedup::SeenCache;
use crate::message::Message;
use crate::types::NodeId;

// ── Routing decisions ──────────────────────────────────────────────────

/// What to do with an inbound message.
#[derive(Debug)]
pub enum RoutingAction {
    /// Addressed to us. Hand to the controller for its payload type.
    Deliver(Message),
    /// Re-broadcast on every link except the one it arrived on.
    /// The hop limit has already been decremented.
    Forward(Message),
    /// Not forwardable.
    Reject { reason: RejectReason },
    /// Already forwarded. Silently ignored.
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No hops left after decrementing.
    HopLimitExhausted,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::HopLimitExhausted => f.write_str("hop limit exhausted"),
        }
    }
}

// ── Router ─────────────────────────────────────────────────────────────

/// Pure routing engine with no I/O.
///
/// Call `route()` with an inbound message, act on the returned `RoutingAction`.
/// Call `record_sent()` for every message this node originates.
#[derive(Debug)]
pub struct Router {
    local_id: NodeId,
    /// Identifiers this node already transmitted or forwarded.
    seen: SeenCache,
}

impl Router {
    pub fn new(local_id: NodeId, dedup_capacity: usize, dedup_ttl: Duration) -> Self {
        Self {
            local_id,
            seen: SeenCache::new(dedup_capacity, dedup_ttl),
        }
    }

    /// The local node's address.
    pub fn local_id(&self) -> NodeId {
        self.local_id
    }

    /// Route an inbound message. Returns the action to take.
    ///
    /// A `Forward` decision records the identifier as sent, whatever the
    /// outcome of the individual link sends.
    pub fn route(&mut self, mut message: Message) -> RoutingAction {
        if message.destination == self.local_id {
            return RoutingAction::Deliver(message);
        }

        if message.hop_limit > 0 {
            message.hop_limit -= 1;
        }
        if message.hop_limit < 1 {
            return RoutingAction::Reject {
                reason: RejectReason::HopLimitExhausted,
            };
        }

        if self.seen.contains(&message.identifier) {
            return RoutingAction::Drop;
        }
        self.seen.insert(message.identifier);

        RoutingAction::Forward(message)
    }

    /// Remember an originated message so it is never re-forwarded here.
    pub fn record_sent(&mut self, identifier: Uuid) {
        self.seen.insert(identifier);
    }

    /// Evict expired dedup entries.
    pub fn purge_seen(&mut self) {
        self.seen.purge_expired();
    }

    /// Number of remembered identifiers.
    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }
}
