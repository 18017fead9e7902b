use mesh_protocol::LinkError;

/// Failures reported by a radio device.
#[derive(Debug, thiserror::Error)]
pub enum RadioError {
    /// Nothing arrived within the receive window. Not a fault.
    #[error("receive window elapsed")]
    Timeout,

    #[error("radio i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("radio device error: {0}")]
    Device(String),
}

impl From<RadioError> for LinkError {
    fn from(err: RadioError) -> Self {
        match err {
            RadioError::Io(e) => LinkError::Io(e),
            other => LinkError::Radio(other.to_string()),
        }
    }
}
