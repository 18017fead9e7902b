//! In-memory link layers for mesh integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mesh_protocol::{
    InboundHandler, LinkError, LinkLayer, LinkLayerTransport, Mesh, MeshConfig, Message, NodeId,
};
use tokio::sync::mpsc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

/// Deterministic node address from a seed.
pub fn node_id(seed: u8) -> NodeId {
    NodeId::from_u128(0x6d65_7368_0000_0000_0000_0000_0000_0000 | seed as u128)
}

pub fn node(seed: u8) -> Mesh {
    Mesh::new(node_id(seed), MeshConfig::default())
}

/// A link layer backed by an in-process channel.
///
/// Linked mocks deliver each sent message, after a trip through the wire
/// codec, to their peer's inbound handler on a spawned task. Standalone
/// mocks only record.
pub struct MockLink {
    layer: LinkLayer,
    peer: Option<mpsc::UnboundedSender<Vec<u8>>>,
    inbound: Arc<Mutex<Option<InboundHandler>>>,
    sent: Mutex<Vec<Message>>,
    fail: AtomicBool,
}

impl MockLink {
    /// A link connected to nothing.
    pub fn standalone(layer: LinkLayer) -> Arc<Self> {
        Arc::new(Self {
            layer,
            peer: None,
            inbound: Arc::new(Mutex::new(None)),
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    /// Two links wired back to back. Must be called inside a tokio runtime.
    pub fn pair(layer: LinkLayer) -> (Arc<Self>, Arc<Self>) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();

        let a = Arc::new(Self {
            layer,
            peer: Some(b_tx),
            inbound: Arc::new(Mutex::new(None)),
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        });
        let b = Arc::new(Self {
            layer,
            peer: Some(a_tx),
            inbound: Arc::new(Mutex::new(None)),
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        });

        spawn_receiver(a_rx, a.inbound.clone());
        spawn_receiver(b_rx, b.inbound.clone());
        (a, b)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl LinkLayerTransport for MockLink {
    fn link_layer(&self) -> LinkLayer {
        self.layer
    }

    fn send(&self, message: &Message) -> Result<(), LinkError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LinkError::Radio("mock link failure".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        if let Some(peer) = &self.peer {
            peer.send(message.to_bytes()).map_err(|_| LinkError::Closed)?;
        }
        Ok(())
    }

    fn set_inbound(&self, handler: InboundHandler) {
        *self.inbound.lock().unwrap() = Some(handler);
    }
}

fn spawn_receiver(
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
    inbound: Arc<Mutex<Option<InboundHandler>>>,
) {
    tokio::spawn(async move {
        while let Some(bytes) = rx.recv().await {
            let message = match Message::from_bytes(&bytes) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!("mock link dropped undecodable bytes: {e}");
                    continue;
                }
            };
            let handler = inbound.lock().unwrap().clone();
            if let Some(handler) = handler {
                handler(message);
            }
        }
    });
}

/// Connect two meshes with a fresh link pair.
pub fn connect(a: &Mesh, b: &Mesh, layer: LinkLayer) -> (Arc<MockLink>, Arc<MockLink>) {
    let (link_a, link_b) = MockLink::pair(layer);
    a.attach(link_a.clone());
    b.attach(link_b.clone());
    (link_a, link_b)
}

/// Poll `condition` until it holds or `timeout` passes.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
