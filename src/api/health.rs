//! Shared health state for the /health endpoint.
//! Updated by the game service and the DB writer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Shared health metrics. Updated by service components, read by API.
#[derive(Default)]
pub struct HealthState {
    /// True when the most recent attribute lookup succeeded.
    pub quote_api_ok: AtomicBool,
    /// Nanosecond timestamp of the last completed lookup (0 = none).
    pub last_lookup_at_ns: AtomicU64,
    /// Lookups that failed or timed out since start.
    pub lookup_failures: AtomicU64,
    /// Session rows that failed to persist since start.
    pub db_write_errors: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_lookup(&self, ok: bool, at_ns: u64) {
        self.quote_api_ok.store(ok, Ordering::Relaxed);
        self.last_lookup_at_ns.store(at_ns, Ordering::Relaxed);
        if !ok {
            self.lookup_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_db_write_errors(&self) {
        self.db_write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn quote_api_ok(&self) -> bool {
        self.quote_api_ok.load(Ordering::Relaxed)
    }

    pub fn last_lookup_at_ns(&self) -> u64 {
        self.last_lookup_at_ns.load(Ordering::Relaxed)
    }

    pub fn lookup_failures(&self) -> u64 {
        self.lookup_failures.load(Ordering::Relaxed)
    }

    pub fn db_write_errors(&self) -> u64 {
        self.db_write_errors.load(Ordering::Relaxed)
    }
}
