use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use uuid::Uuid;

/// Bounded memory of recently sent or forwarded packet identifiers.
///
/// Capacity-bounded (least recently inserted entries fall out first) and
/// time-bounded (an entry older than `ttl` no longer counts as seen).
#[derive(Debug)]
pub struct SeenCache {
    entries: LruCache<Uuid, Instant>,
    ttl: Duration,
}

impl SeenCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            ttl,
        }
    }

    /// Whether `identifier` was recorded within the last `ttl`.
    ///
    /// An expired entry is removed as a side effect.
    pub fn contains(&mut self, identifier: &Uuid) -> bool {
        match self.entries.peek(identifier) {
            Some(seen_at) if seen_at.elapsed() < self.ttl => true,
            Some(_) => {
                self.entries.pop(identifier);
                false
            }
            None => false,
        }
    }

    /// Record `identifier` as seen now.
    pub fn insert(&mut self, identifier: Uuid) {
        self.entries.put(identifier, Instant::now());
    }

    /// Evict every expired entry.
    pub fn purge_expired(&mut self) {
        let ttl = self.ttl;
        let expired: Vec<Uuid> = self
            .entries
            .iter()
            .filter(|(_, seen_at)| seen_at.elapsed() >= ttl)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            self.entries.pop(&id);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
