use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use mesh_protocol::{
    DecodeError, InboundHandler, LinkError, LinkLayer, LinkLayerTransport, Message, NodeId,
};
use tokio::sync::{broadcast, mpsc};

use super::frame::{LoRaAdvertisement, LoRaFrame, Location};
use super::LoRaSocket;
use crate::config::LoRaConfig;
use crate::error::RadioError;

const ADVERTISEMENT_BUFFER: usize = 64;

/// Mesh link layer over a LoRa radio.
///
/// A dedicated OS thread owns the radio and loops: receive one frame,
/// dispatch it, then transmit at most one queued frame
/// `transmit_window_size` times. [`send`](LinkLayerTransport::send) only
/// enqueues.
pub struct LoRaMeshSocket {
    node: NodeId,
    shared: Arc<Shared>,
    advertisements: broadcast::Sender<LoRaAdvertisement>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// State shared between the handle and the worker thread.
struct Shared {
    queue: mpsc::Sender<LoRaFrame>,
    capacity: usize,
    inbound: Mutex<Option<InboundHandler>>,
    running: AtomicBool,
}

impl Shared {
    fn enqueue(&self, frame: LoRaFrame) -> Result<(), LinkError> {
        if !self.running.load(Ordering::Acquire) {
            return Err(LinkError::Closed);
        }
        self.queue.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => LinkError::QueueFull {
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => LinkError::Closed,
        })
    }

    fn queued(&self) -> usize {
        self.queue.max_capacity() - self.queue.capacity()
    }
}

impl LoRaMeshSocket {
    /// Start the worker thread on `socket`.
    pub fn spawn<S: LoRaSocket>(
        node: NodeId,
        socket: S,
        config: LoRaConfig,
    ) -> Result<Self, LinkError> {
        let capacity = config.queue_capacity.max(1);
        let (queue, outbound) = mpsc::channel(capacity);
        let shared = Arc::new(Shared {
            queue,
            capacity,
            inbound: Mutex::new(None),
            running: AtomicBool::new(true),
        });
        let (advertisements, _) = broadcast::channel(ADVERTISEMENT_BUFFER);

        let worker = Worker {
            node,
            socket,
            shared: shared.clone(),
            outbound,
            advertisements: advertisements.clone(),
            config,
        };
        let handle = thread::Builder::new()
            .name(format!("lora-mesh-{node}"))
            .spawn(move || worker.run())?;

        tracing::info!("lora mesh socket started for {node}");
        Ok(Self {
            node,
            shared,
            advertisements,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Address this socket advertises.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Queue an advertisement for this node.
    pub fn advertise(&self, location: Option<Location>) -> Result<(), LinkError> {
        self.shared.enqueue(LoRaFrame::Advertisement(LoRaAdvertisement {
            node: self.node,
            location,
        }))
    }

    /// Subscribe to advertisements heard on the radio.
    pub fn advertisements(&self) -> broadcast::Receiver<LoRaAdvertisement> {
        self.advertisements.subscribe()
    }

    /// Frames waiting for transmission.
    pub fn queued(&self) -> usize {
        self.shared.queued()
    }

    /// Stop the worker and wait for it to release the radio.
    ///
    /// Frames still queued are discarded. Later sends fail with
    /// [`LinkError::Closed`].
    pub fn shutdown(&self) {
        self.shared.running.store(false, Ordering::Release);
        let Some(handle) = lock(&self.worker).take() else {
            return;
        };
        // Dropping the last handle from inside a dispatch runs on the worker.
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            tracing::warn!("lora worker for {} panicked", self.node);
        }
        tracing::debug!("lora mesh socket for {} stopped", self.node);
    }
}

impl LinkLayerTransport for LoRaMeshSocket {
    fn link_layer(&self) -> LinkLayer {
        LinkLayer::LongRangeRadio
    }

    fn send(&self, message: &Message) -> Result<(), LinkError> {
        self.shared.enqueue(LoRaFrame::MeshPacket(message.clone()))
    }

    fn set_inbound(&self, handler: InboundHandler) {
        *lock(&self.shared.inbound) = Some(handler);
    }
}

impl Drop for LoRaMeshSocket {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for LoRaMeshSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoRaMeshSocket")
            .field("node", &self.node)
            .field("queued", &self.queued())
            .finish()
    }
}

struct Worker<S> {
    node: NodeId,
    socket: S,
    shared: Arc<Shared>,
    outbound: mpsc::Receiver<LoRaFrame>,
    advertisements: broadcast::Sender<LoRaAdvertisement>,
    config: LoRaConfig,
}

impl<S: LoRaSocket> Worker<S> {
    fn run(mut self) {
        let mut next_advertisement = self
            .config
            .advertisement_interval
            .map(|interval| Instant::now() + interval);

        while self.shared.running.load(Ordering::Acquire) {
            let received = self.receive();
            if let Some(bytes) = &received {
                self.handle_frame(bytes);
            }

            if let (Some(due), Some(interval)) =
                (next_advertisement, self.config.advertisement_interval)
            {
                if Instant::now() >= due {
                    self.queue_advertisement();
                    next_advertisement = Some(Instant::now() + interval);
                }
            }

            match self.outbound.try_recv().ok() {
                Some(frame) => self.transmit(&frame),
                None if received.is_none() => thread::sleep(self.config.idle_delay),
                None => {}
            }
        }
        tracing::trace!("lora worker for {} exiting", self.node);
    }

    fn receive(&mut self) -> Option<Vec<u8>> {
        match self.socket.receive(self.config.receive_window_size) {
            Ok(data) => data,
            Err(RadioError::Timeout) => None,
            Err(e) => {
                tracing::warn!("lora receive failed: {e}");
                None
            }
        }
    }

    fn handle_frame(&self, bytes: &[u8]) {
        match LoRaFrame::from_bytes(bytes) {
            Ok(LoRaFrame::Advertisement(advertisement)) => {
                tracing::debug!("advertisement from {}", advertisement.node);
                // No subscribers is fine.
                let _ = self.advertisements.send(advertisement);
            }
            Ok(LoRaFrame::MeshPacket(message)) => {
                tracing::trace!("received {} from {}", message.identifier, message.source);
                let handler = lock(&self.shared.inbound).clone();
                match handler {
                    Some(handler) => handler(message),
                    None => tracing::debug!("no inbound handler, dropping {}", message.identifier),
                }
            }
            Err(DecodeError::UnsupportedVersion(version)) => {
                tracing::trace!("ignoring mesh packet with version {version}");
            }
            Err(e) => tracing::warn!("could not decode lora frame ({} bytes): {e}", bytes.len()),
        }
    }

    fn queue_advertisement(&self) {
        let advertisement = LoRaFrame::Advertisement(LoRaAdvertisement {
            node: self.node,
            location: self.config.location,
        });
        if let Err(e) = self.shared.enqueue(advertisement) {
            tracing::debug!("skipping advertisement: {e}");
        }
    }

    fn transmit(&mut self, frame: &LoRaFrame) {
        let bytes = frame.to_bytes();
        for attempt in 0..self.config.transmit_window_size {
            if let Err(e) = self.socket.transmit(&bytes) {
                tracing::warn!(
                    "lora transmit {}/{} failed: {e}",
                    attempt + 1,
                    self.config.transmit_window_size
                );
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
