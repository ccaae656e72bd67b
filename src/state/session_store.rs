use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::GameResult;
use crate::session::Session;
use crate::types::Outcome;

/// (player, day): the address of exactly one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub player_id: String,
    pub day: NaiveDate,
}

impl SessionKey {
    pub fn new(player_id: impl Into<String>, day: NaiveDate) -> Self {
        Self { player_id: player_id.into(), day }
    }

    pub fn of(session: &Session) -> Self {
        Self::new(session.player_id(), session.day())
    }
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// In-memory sessions keyed by (player, day).
///
/// Mutations run under the DashMap entry guard for their key, so two requests
/// for the same session are serialized while different keys proceed in
/// parallel. Every stored change is queued to the DB writer from inside that
/// guard, which keeps the queue in mutation order per key.
pub struct SessionStore {
    sessions: DashMap<SessionKey, Session>,
    persist_tx: Option<mpsc::Sender<Session>>,
}

impl SessionStore {
    #[cfg(test)]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_persistence(persist_tx: mpsc::Sender<Session>) -> Arc<Self> {
        Arc::new(Self { sessions: DashMap::new(), persist_tx: Some(persist_tx) })
    }

    pub fn get(&self, key: &SessionKey) -> Option<Session> {
        self.sessions.get(key).map(|s| s.clone())
    }

    /// Insert or replace the session at its own key.
    #[cfg(test)]
    pub fn put(&self, session: Session) {
        self.persist(&session);
        self.sessions.insert(SessionKey::of(&session), session);
    }

    /// Returns the live session for `key`, creating it with `init` only if absent.
    /// The bool is true when this call created it. An existing session is never
    /// replaced, so a player cannot reset their day.
    pub fn get_or_create(&self, key: SessionKey, init: impl FnOnce() -> Session) -> (Session, bool) {
        match self.sessions.entry(key) {
            Entry::Occupied(e) => (e.get().clone(), false),
            Entry::Vacant(e) => {
                let session = init();
                self.persist(&session);
                (e.insert(session).clone(), true)
            }
        }
    }

    /// Read-modify-write one session under its key's lock. `None` if absent.
    /// The change is persisted only when `f` succeeds.
    pub fn update<R>(&self, key: &SessionKey, f: impl FnOnce(&mut Session) -> GameResult<R>) -> Option<GameResult<R>> {
        let mut entry = self.sessions.get_mut(key)?;
        let mut draft = entry.clone();
        let result = f(&mut draft);
        if result.is_ok() {
            if draft != *entry {
                self.persist(&draft);
            }
            *entry = draft;
        }
        Some(result)
    }

    /// Load persisted sessions without re-queuing them for persistence.
    pub fn hydrate(&self, sessions: Vec<Session>) {
        for session in sessions {
            self.sessions.insert(SessionKey::of(&session), session);
        }
    }

    /// Drop sessions from days before `today`. Returns how many were removed.
    pub fn remove_before(&self, today: NaiveDate) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|key, _| key.day >= today);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn in_progress_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|e| e.value().outcome() == Outcome::InProgress)
            .count()
    }

    fn persist(&self, session: &Session) {
        if let Some(tx) = &self.persist_tx {
            if let Err(e) = tx.try_send(session.clone()) {
                warn!(player_id = %session.player_id(), day = %session.day(), "Session persist queue full: {e}");
            }
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self { sessions: DashMap::new(), persist_tx: None }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
