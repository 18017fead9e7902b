use std::net::SocketAddr;
use std::time::Duration;

use crate::lora::Location;

/// Configuration for a [`LoRaMeshSocket`](crate::LoRaMeshSocket).
///
/// ```rust
/// use std::time::Duration;
/// use mesh_transport::LoRaConfig;
///
/// let config = LoRaConfig::new()
///     .transmit_window_size(3)
///     .advertisement_interval(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct LoRaConfig {
    /// Receive window handed to the radio on every worker iteration.
    pub(crate) receive_window_size: u16,
    /// Times each queued frame is transmitted back to back.
    pub(crate) transmit_window_size: u16,
    /// Maximum number of frames waiting for transmission.
    pub(crate) queue_capacity: usize,
    /// Worker pause when an iteration neither received nor transmitted.
    pub(crate) idle_delay: Duration,
    /// Period of automatic advertisements. `None` disables them.
    pub(crate) advertisement_interval: Option<Duration>,
    /// Position carried by automatic advertisements.
    pub(crate) location: Option<Location>,
}

impl Default for LoRaConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LoRaConfig {
    pub fn new() -> Self {
        Self {
            receive_window_size: 10,
            transmit_window_size: 10,
            queue_capacity: 64,
            idle_delay: Duration::from_millis(5),
            advertisement_interval: None,
            location: None,
        }
    }

    /// Set the receive window (default: 10).
    pub fn receive_window_size(mut self, size: u16) -> Self {
        self.receive_window_size = size;
        self
    }

    /// Set the redundant transmission count (default: 10).
    pub fn transmit_window_size(mut self, size: u16) -> Self {
        self.transmit_window_size = size;
        self
    }

    /// Set the outbound queue bound (default: 64 frames).
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the idle pause (default: 5 ms).
    pub fn idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = delay;
        self
    }

    /// Advertise this node every `interval` (default: never).
    pub fn advertisement_interval(mut self, interval: Duration) -> Self {
        self.advertisement_interval = Some(interval);
        self
    }

    /// Include `location` in automatic advertisements.
    pub fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// Configuration for a [`UdpTransport`](crate::UdpTransport).
///
/// ```rust
/// use mesh_transport::UdpConfig;
///
/// let config = UdpConfig::new("0.0.0.0:7700".parse().unwrap())
///     .peer("192.168.1.20:7700".parse().unwrap())
///     .queue_capacity(512);
/// ```
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Local address to bind.
    pub(crate) bind: SocketAddr,
    /// Every datagram is sent to each of these.
    pub(crate) peers: Vec<SocketAddr>,
    /// Outbound channel bound.
    pub(crate) queue_capacity: usize,
    /// Largest datagram sent or accepted.
    pub(crate) max_datagram_size: usize,
}

impl UdpConfig {
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            peers: Vec::new(),
            queue_capacity: 256,
            max_datagram_size: 65_507,
        }
    }

    /// Add a peer.
    pub fn peer(mut self, addr: SocketAddr) -> Self {
        self.peers.push(addr);
        self
    }

    /// Add several peers.
    pub fn peers(mut self, addrs: impl IntoIterator<Item = SocketAddr>) -> Self {
        self.peers.extend(addrs);
        self
    }

    /// Set the outbound queue bound (default: 256 datagrams).
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the datagram size limit (default: 65507 bytes).
    pub fn max_datagram_size(mut self, bytes: usize) -> Self {
        self.max_datagram_size = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lora_defaults() {
        let config = LoRaConfig::default();
        assert_eq!(config.receive_window_size, 10);
        assert_eq!(config.transmit_window_size, 10);
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.idle_delay, Duration::from_millis(5));
        assert!(config.advertisement_interval.is_none());
        assert!(config.location.is_none());
    }

    #[test]
    fn udp_builder_accumulates_peers() {
        let a: SocketAddr = "10.0.0.1:7700".parse().unwrap();
        let b: SocketAddr = "10.0.0.2:7700".parse().unwrap();
        let config = UdpConfig::new("127.0.0.1:0".parse().unwrap())
            .peer(a)
            .peers([b]);
        assert_eq!(config.peers, vec![a, b]);
        assert_eq!(config.queue_capacity, 256);
        assert_eq!(config.max_datagram_size, 65_507);
    }
}
