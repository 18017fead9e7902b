use std::time::Duration;

use crate::types::DEFAULT_HOP_LIMIT;

/// Configuration for a [`Mesh`](crate::Mesh).
///
/// All fields have sensible defaults. Use the builder pattern:
///
/// ```rust
/// use std::time::Duration;
/// use mesh_protocol::MeshConfig;
///
/// let config = MeshConfig::new()
///     .hop_limit(8)
///     .dedup_ttl(Duration::from_secs(120));
/// ```
#[derive(Debug, Clone)]
pub struct MeshConfig {
    /// Hop limit stamped on messages this node originates.
    pub(crate) hop_limit: u8,
    /// Maximum number of remembered packet identifiers.
    pub(crate) dedup_capacity: usize,
    /// How long a remembered identifier keeps suppressing re-forwarding.
    pub(crate) dedup_ttl: Duration,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshConfig {
    pub fn new() -> Self {
        Self {
            hop_limit: DEFAULT_HOP_LIMIT,
            dedup_capacity: 4096,
            dedup_ttl: Duration::from_secs(600),
        }
    }

    /// Set the hop limit for originated messages (default: 255).
    pub fn hop_limit(mut self, hops: u8) -> Self {
        self.hop_limit = hops;
        self
    }

    /// Set the dedup cache capacity (default: 4096 identifiers).
    pub fn dedup_capacity(mut self, capacity: usize) -> Self {
        self.dedup_capacity = capacity;
        self
    }

    /// Set the dedup entry lifetime (default: 10 min).
    pub fn dedup_ttl(mut self, ttl: Duration) -> Self {
        self.dedup_ttl = ttl;
        self
    }
}
