use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use lru::LruCache;
use mesh_protocol::{
    DecodeError, InboundHandler, LinkError, LinkLayer, LinkLayerTransport, Message,
};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::UdpConfig;

/// Packets whose sending peer is remembered for split-horizon forwarding.
const SOURCE_MEMORY: usize = 1024;
const RECV_BACKOFF_MIN: Duration = Duration::from_millis(10);
const RECV_BACKOFF_MAX: Duration = Duration::from_secs(1);

type Peers = Arc<RwLock<Vec<SocketAddr>>>;
type Inbound = Arc<Mutex<Option<InboundHandler>>>;
type Sources = Arc<Mutex<LruCache<u128, SocketAddr>>>;

/// A datagram waiting for the writer, with the peer it must skip.
struct Outbound {
    datagram: Vec<u8>,
    exclude: Option<SocketAddr>,
}

/// Mesh link layer over UDP.
///
/// Each message travels as one datagram, sent to every configured peer
/// except the one it was received from. A writer task drains a bounded
/// queue; a reader task decodes inbound datagrams and hands them to the
/// inbound handler.
///
/// The peers of one socket usually cannot hear each other, so the link is
/// multipoint: the mesh may forward a packet back out on the link it
/// arrived on and the transport leaves out the sender.
pub struct UdpTransport {
    local_addr: SocketAddr,
    peers: Peers,
    sources: Sources,
    outbound: mpsc::Sender<Outbound>,
    inbound: Inbound,
    queue_capacity: usize,
    max_datagram_size: usize,
    tasks: Vec<JoinHandle<()>>,
}

impl UdpTransport {
    /// Bind the socket and start the reader and writer tasks.
    pub async fn bind(config: UdpConfig) -> Result<Self, LinkError> {
        let socket = Arc::new(UdpSocket::bind(config.bind).await?);
        let local_addr = socket.local_addr()?;

        let peers: Peers = Arc::new(RwLock::new(config.peers));
        let inbound: Inbound = Arc::new(Mutex::new(None));
        let sources: Sources = Arc::new(Mutex::new(LruCache::new(
            NonZeroUsize::new(SOURCE_MEMORY).unwrap_or(NonZeroUsize::MIN),
        )));
        let (outbound, outbound_rx) = mpsc::channel(config.queue_capacity.max(1));

        let writer = tokio::spawn(write_loop(socket.clone(), outbound_rx, peers.clone()));
        let reader = tokio::spawn(read_loop(
            socket,
            inbound.clone(),
            sources.clone(),
            config.max_datagram_size,
        ));

        tracing::info!("udp link bound on {local_addr}");
        Ok(Self {
            local_addr,
            peers,
            sources,
            outbound,
            inbound,
            queue_capacity: config.queue_capacity,
            max_datagram_size: config.max_datagram_size,
            tasks: vec![writer, reader],
        })
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start sending to `addr` as well.
    pub fn add_peer(&self, addr: SocketAddr) {
        let mut peers = self.peers.write().unwrap_or_else(|p| p.into_inner());
        if !peers.contains(&addr) {
            peers.push(addr);
            tracing::debug!("udp peer added: {addr}");
        }
    }

    /// Current peer list.
    pub fn peers(&self) -> Vec<SocketAddr> {
        self.peers.read().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl LinkLayerTransport for UdpTransport {
    fn link_layer(&self) -> LinkLayer {
        LinkLayer::Ip
    }

    fn is_multipoint(&self) -> bool {
        true
    }

    fn send(&self, message: &Message) -> Result<(), LinkError> {
        let size = message.encoded_len();
        if size > self.max_datagram_size {
            return Err(LinkError::TooLarge {
                size,
                max: self.max_datagram_size,
            });
        }
        let exclude = lock(&self.sources)
            .peek(&message.identifier.as_u128())
            .copied();
        let outbound = Outbound {
            datagram: message.to_bytes(),
            exclude,
        };
        self.outbound.try_send(outbound).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => LinkError::QueueFull {
                capacity: self.queue_capacity,
            },
            mpsc::error::TrySendError::Closed(_) => LinkError::Closed,
        })
    }

    fn set_inbound(&self, handler: InboundHandler) {
        *lock(&self.inbound) = Some(handler);
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("local_addr", &self.local_addr)
            .field("peers", &self.peers())
            .finish()
    }
}

async fn write_loop(socket: Arc<UdpSocket>, mut rx: mpsc::Receiver<Outbound>, peers: Peers) {
    while let Some(Outbound { datagram, exclude }) = rx.recv().await {
        let targets = peers.read().unwrap_or_else(|p| p.into_inner()).clone();
        for peer in targets {
            if Some(peer) == exclude {
                continue;
            }
            if let Err(e) = socket.send_to(&datagram, peer).await {
                tracing::warn!("udp send to {peer} failed: {e}");
            }
        }
    }
}

async fn read_loop(
    socket: Arc<UdpSocket>,
    inbound: Inbound,
    sources: Sources,
    max_datagram_size: usize,
) {
    // One spare byte tells a datagram that fits from one the kernel truncated.
    let mut buf = vec![0u8; max_datagram_size.saturating_add(1)];
    let mut backoff = None;
    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(received) => {
                backoff = None;
                received
            }
            Err(e) => {
                let delay = recv_backoff(backoff);
                backoff = Some(delay);
                tracing::warn!("udp receive failed, retrying in {delay:?}: {e}");
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        if len > max_datagram_size {
            tracing::warn!("dropping datagram from {from}: larger than {max_datagram_size} bytes");
            continue;
        }

        let message = match Message::from_bytes(&buf[..len]) {
            Ok(message) => message,
            Err(DecodeError::UnsupportedVersion(version)) => {
                tracing::trace!("ignoring version {version} datagram from {from}");
                continue;
            }
            Err(e) => {
                tracing::warn!("bad datagram from {from}: {e}");
                continue;
            }
        };

        lock(&sources).put(message.identifier.as_u128(), from);

        let handler = lock(&inbound).clone();
        match handler {
            Some(handler) => handler(message),
            None => tracing::debug!("no inbound handler, dropping datagram from {from}"),
        }
    }
}

/// Delay before the next receive after a failure, doubling up to a ceiling.
fn recv_backoff(previous: Option<Duration>) -> Duration {
    match previous {
        None => RECV_BACKOFF_MIN,
        Some(delay) => (delay * 2).min(RECV_BACKOFF_MAX),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
