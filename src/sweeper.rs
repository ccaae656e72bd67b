use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::daily::Clock;
use crate::state::SessionStore;

/// Background task that drops in-memory sessions from previous days.
/// Persisted rows are kept; only the live map is rotated.
pub struct DaySweeper {
    store: Arc<SessionStore>,
    clock: Box<dyn Clock>,
    interval: Duration,
}

impl DaySweeper {
    pub fn new(store: Arc<SessionStore>, clock: Box<dyn Clock>, interval: Duration) -> Self {
        Self { store, clock, interval }
    }

    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.tick().await; // consume immediate first tick

        loop {
            interval.tick().await;
            self.sweep_once();
        }
    }

    pub fn sweep_once(&self) -> usize {
        let today = self.clock.today();
        let removed = self.store.remove_before(today);
        if removed > 0 {
            info!(%today, removed, remaining = self.store.len(), "Rotated out previous days' sessions");
        } else {
            debug!(%today, "Day sweep found nothing to remove");
        }
        removed
    }
}
