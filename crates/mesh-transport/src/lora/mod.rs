//! LoRa-class radio link layer.
//!
//! The radio is lossy and unacknowledged: every frame is transmitted
//! several times in a row and receivers rely on the mesh's duplicate
//! suppression to discard the extra copies.
mod frame;
mod socket;

pub use frame::{LoRaAdvertisement, LoRaFrame, LoRaFrameType, Location, FLAG_LOCATION};
pub use socket::LoRaMeshSocket;

use crate::error::RadioError;

/// A half-duplex radio device.
///
/// Owned by the transport's worker thread, so calls may block for up to
/// the receive window.
pub trait LoRaSocket: Send + 'static {
    /// Transmit one frame.
    fn transmit(&mut self, data: &[u8]) -> Result<(), RadioError>;

    /// Listen for one frame for up to `window_size` radio units.
    ///
    /// `Ok(None)` and [`RadioError::Timeout`] both mean nothing arrived.
    fn receive(&mut self, window_size: u16) -> Result<Option<Vec<u8>>, RadioError>;
}
