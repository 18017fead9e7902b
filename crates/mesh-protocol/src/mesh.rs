//! The mesh node: attached transports, protocol controllers and the router.
//!
//! [`Mesh`] executes the decisions made by the pure [`Router`]. Inbound
//! messages are dispatched inline on whichever transport worker delivered
//! them, so nothing here blocks: locks are held only long enough to clone
//! out what is needed, and never across a call into a transport or a
//! controller.
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use crate::config::MeshConfig;
use crate::controller::{ControlMessageController, ControllerDelegate, ProtocolController};
use crate::error::{LinkError, MeshError};
use crate::link::{LinkId, LinkLayerTransport};
use crate::message::Message;
use crate::router::{Router, RoutingAction};
use crate::types::{LinkLayer, NodeId, PayloadType};

type Links = Vec<(LinkId, Arc<dyn LinkLayerTransport>)>;
type Controllers = HashMap<PayloadType, Arc<dyn ProtocolController>>;

/// A mesh node.
///
/// Cloning is cheap and yields another handle to the same node.
#[derive(Clone)]
pub struct Mesh {
    inner: Arc<MeshInner>,
}

struct MeshInner {
    address: NodeId,
    router: Mutex<Router>,
    links: RwLock<Links>,
    controllers: RwLock<Controllers>,
    control: Arc<ControlMessageController>,
}

impl Mesh {
    /// Create a node with the control message controller installed.
    pub fn new(address: NodeId, config: MeshConfig) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<MeshInner>| {
            let delegate: Arc<dyn ControllerDelegate> = Arc::new(MeshDelegate(weak.clone()));
            let control = Arc::new(ControlMessageController::new(
                address,
                config.hop_limit,
                delegate,
            ));

            let mut controllers: Controllers = HashMap::new();
            controllers.insert(
                control.payload_type(),
                control.clone() as Arc<dyn ProtocolController>,
            );

            MeshInner {
                address,
                router: Mutex::new(Router::new(
                    address,
                    config.dedup_capacity,
                    config.dedup_ttl,
                )),
                links: RwLock::new(Vec::new()),
                controllers: RwLock::new(controllers),
                control,
            }
        });
        tracing::debug!("mesh node {address} created");
        Self { inner }
    }

    /// This node's address.
    pub fn address(&self) -> NodeId {
        self.inner.address
    }

    /// Attach a transport and route its inbound messages into this mesh.
    pub fn attach(&self, transport: Arc<dyn LinkLayerTransport>) -> LinkId {
        let id = {
            let mut links = write(&self.inner.links);
            let id = LinkId(links.len());
            links.push((id, transport.clone()));
            id
        };

        let weak = Arc::downgrade(&self.inner);
        transport.set_inbound(Arc::new(move |message| {
            if let Some(inner) = weak.upgrade() {
                inner.dispatch(message, id);
            }
        }));

        tracing::info!(
            "attached {} link {} to {}",
            transport.link_layer(),
            id.index(),
            self.inner.address
        );
        id
    }

    /// Install `controller` for its payload type.
    ///
    /// Returns the controller it replaced, if any.
    pub fn register_controller(
        &self,
        controller: Arc<dyn ProtocolController>,
    ) -> Option<Arc<dyn ProtocolController>> {
        let payload_type = controller.payload_type();
        let previous = write(&self.inner.controllers).insert(payload_type, controller);
        tracing::debug!("controller registered for payload type {payload_type}");
        previous
    }

    /// The built-in control message controller.
    pub fn control(&self) -> Arc<ControlMessageController> {
        self.inner.control.clone()
    }

    /// A delegate handle for building additional controllers.
    ///
    /// The handle does not keep the mesh alive.
    pub fn delegate(&self) -> Arc<dyn ControllerDelegate> {
        Arc::new(MeshDelegate(Arc::downgrade(&self.inner)))
    }

    /// Route one inbound message that arrived on `arrived_on`.
    pub fn dispatch(&self, message: Message, arrived_on: LinkId) {
        self.inner.dispatch(message, arrived_on);
    }

    /// Send an originated message on every attached link.
    pub fn transmit(&self, message: Message) -> Result<(), MeshError> {
        self.inner.transmit(message)
    }

    /// Link layers of the attached transports.
    pub fn link_layers(&self) -> BTreeSet<LinkLayer> {
        self.inner.link_layers()
    }

    /// Evict expired identifiers from the dedup cache.
    pub fn purge_seen(&self) {
        self.inner.router().purge_seen();
    }

    /// Number of identifiers currently in the dedup cache.
    pub fn seen_len(&self) -> usize {
        self.inner.router().seen_len()
    }
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("address", &self.inner.address)
            .field("links", &read(&self.inner.links).len())
            .finish()
    }
}

impl MeshInner {
    fn dispatch(&self, message: Message, arrived_on: LinkId) {
        let identifier = message.identifier;
        let action = self.router().route(message);

        match action {
            RoutingAction::Deliver(message) => {
                let controller = read(&self.controllers).get(&message.payload_type).cloned();
                match controller {
                    Some(controller) => controller.did_receive_message(message),
                    None => tracing::warn!(
                        "no controller for payload type {} (message {identifier} from {})",
                        message.payload_type,
                        message.source
                    ),
                }
            }
            RoutingAction::Forward(message) => {
                tracing::trace!("forwarding {identifier} ({} hops left)", message.hop_limit);
                if self.send_on_links(&message, Some(arrived_on)).is_err() {
                    tracing::debug!("{identifier} could not be forwarded on any link");
                }
            }
            RoutingAction::Reject { reason } => {
                tracing::debug!("dropping {identifier}: {reason}");
            }
            RoutingAction::Drop => {
                tracing::trace!("duplicate {identifier} suppressed");
            }
        }
    }

    fn transmit(&self, message: Message) -> Result<(), MeshError> {
        self.router().record_sent(message.identifier);
        self.send_on_links(&message, None)
    }

    /// Send on every link except `skip`, unless `skip` is multipoint.
    ///
    /// Fails only when there was at least one link and every send failed.
    fn send_on_links(&self, message: &Message, skip: Option<LinkId>) -> Result<(), MeshError> {
        let links: Links = read(&self.links)
            .iter()
            .filter(|(id, link)| Some(*id) != skip || link.is_multipoint())
            .cloned()
            .collect();

        let mut last_error: Option<LinkError> = None;
        let mut delivered = links.is_empty();
        for (id, link) in links {
            match link.send(message) {
                Ok(()) => delivered = true,
                Err(e) => {
                    tracing::warn!(
                        "send of {} on {} link {} failed: {e}",
                        message.identifier,
                        link.link_layer(),
                        id.index()
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !delivered => Err(MeshError::Link(e)),
            _ => Ok(()),
        }
    }

    fn link_layers(&self) -> BTreeSet<LinkLayer> {
        read(&self.links)
            .iter()
            .map(|(_, link)| link.link_layer())
            .collect()
    }

    fn router(&self) -> MutexGuard<'_, Router> {
        self.router.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Controller-side handle to a mesh. Holds no ownership.
struct MeshDelegate(Weak<MeshInner>);

impl ControllerDelegate for MeshDelegate {
    fn request_transmit(&self, message: Message) -> Result<(), MeshError> {
        self.0
            .upgrade()
            .ok_or(MeshError::Shutdown)?
            .transmit(message)
    }

    fn available_link_layers(&self) -> BTreeSet<LinkLayer> {
        self.0
            .upgrade()
            .map(|inner| inner.link_layers())
            .unwrap_or_default()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
