use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::types::{AttributeSnapshot, Symbol};

/// Per-symbol snapshot cache with a fixed lifetime. Expired entries are evicted
/// when read. Only successful lookups are cached.
pub struct AttributeCache {
    ttl: Duration,
    entries: DashMap<Symbol, (Instant, AttributeSnapshot)>,
}

impl AttributeCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: DashMap::new() }
    }

    pub fn get(&self, symbol: &Symbol) -> Option<AttributeSnapshot> {
        self.get_at(symbol, Instant::now())
    }

    pub fn insert(&self, symbol: Symbol, snapshot: AttributeSnapshot) {
        self.entries.insert(symbol, (Instant::now(), snapshot));
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn get_at(&self, symbol: &Symbol, now: Instant) -> Option<AttributeSnapshot> {
        let (stored_at, snapshot) = *self.entries.get(symbol)?;
        if now.saturating_duration_since(stored_at) > self.ttl {
            self.entries.remove(symbol);
            return None;
        }
        Some(snapshot)
    }
}
