//! Mesh link-layer transports.
//!
//! - [`LoRaMeshSocket`]: frames mesh packets and advertisements for a
//!   LoRa-class radio, with redundant transmission on a worker thread.
//! - [`UdpTransport`]: one datagram per message over IP.
//!
//! Both implement [`mesh_protocol::LinkLayerTransport`] and are attached
//! to a [`mesh_protocol::Mesh`].

pub mod config;
pub mod error;
pub mod lora;
pub mod udp;

pub use config::{LoRaConfig, UdpConfig};
pub use error::RadioError;
pub use lora::{
    LoRaAdvertisement, LoRaFrame, LoRaFrameType, LoRaMeshSocket, LoRaSocket, Location,
    FLAG_LOCATION,
};
pub use udp::UdpTransport;
