//! Session enumeration, creation, loading, deletion and appends.
//!
//! The registry owns the set of persisted session ids and the active session.
//! The store is a passive mirror: every state-changing call writes through
//! before the in-memory state is updated, so a failed write leaves the
//! registry unchanged.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use session_store::KeyValueStore;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::keys::{SessionId, SESSION_KEY_PREFIX};
use crate::turn::{decode_turns, encode_turns, Turn};

/// Source of the wall-clock instant used for new session ids.
pub trait Clock: Send {
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        u64::try_from(now.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Settable clock for deterministic ids. Clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    #[must_use]
    pub fn new(millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(millis)),
        }
    }

    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Proof that the user confirmed a destructive action.
///
/// Asking is the caller's job; deletion APIs only accept this token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmed {
    _private: (),
}

impl Confirmed {
    /// Interprets a y/N prompt answer. Anything but `y`/`yes` declines.
    #[must_use]
    pub fn from_answer(answer: &str) -> Option<Self> {
        let answer = answer.trim();
        (answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
            .then_some(Self { _private: () })
    }

    /// For callers that obtained consent some other way.
    #[must_use]
    pub fn granted() -> Self {
        Self { _private: () }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
}

impl SessionSummary {
    fn new(id: SessionId) -> Self {
        Self {
            id,
            title: id.title(),
        }
    }
}

pub struct SessionRegistry {
    persisted: BTreeSet<SessionId>,
    active: SessionId,
    active_turns: Vec<Turn>,
    last_issued: Option<SessionId>,
    clock: Box<dyn Clock>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("persisted", &self.persisted)
            .field("active", &self.active)
            .field("active_turns", &self.active_turns.len())
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    /// Enumerates persisted sessions and activates the most recent one.
    ///
    /// With no persisted sessions the active session is an unpersisted draft
    /// that becomes persisted on its first append.
    pub fn open(store: &dyn KeyValueStore, clock: Box<dyn Clock>) -> Result<Self, EngineError> {
        let persisted: BTreeSet<SessionId> = store
            .keys()?
            .iter()
            .filter_map(|key| SessionId::from_key(key))
            .collect();

        let mut registry = Self {
            persisted,
            active: SessionId::from_millis(0),
            active_turns: Vec::new(),
            last_issued: None,
            clock,
        };

        match registry.persisted.last().copied() {
            Some(latest) => {
                registry.active_turns = read_turns(store, latest);
                registry.active = latest;
            }
            None => registry.active = registry.allocate_id(),
        }

        debug!(
            sessions = registry.persisted.len(),
            active = %registry.active,
            "session registry opened"
        );
        Ok(registry)
    }

    /// Persisted sessions, most recent first. Drafts are not listed.
    #[must_use]
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        self.persisted
            .iter()
            .rev()
            .copied()
            .map(SessionSummary::new)
            .collect()
    }

    #[must_use]
    pub fn active_id(&self) -> SessionId {
        self.active
    }

    #[must_use]
    pub fn active_turns(&self) -> &[Turn] {
        &self.active_turns
    }

    #[must_use]
    pub fn is_persisted(&self, id: SessionId) -> bool {
        self.persisted.contains(&id)
    }

    /// Whether `id` resolves to a persisted session or the active draft.
    #[must_use]
    pub fn contains(&self, id: SessionId) -> bool {
        id == self.active || self.is_persisted(id)
    }

    /// Allocates a fresh id, persists an empty transcript for it and makes it active.
    pub fn create_session(&mut self, store: &mut dyn KeyValueStore) -> Result<SessionId, EngineError> {
        let id = self.allocate_id();
        write_turns(store, id, &[])?;

        self.persisted.insert(id);
        self.active = id;
        self.active_turns.clear();
        debug!(session = %id, "session created");
        Ok(id)
    }

    /// Makes `id` active. Missing or unreadable data loads as an empty transcript.
    pub fn load_session(&mut self, store: &dyn KeyValueStore, id: SessionId) {
        self.active_turns = read_turns(store, id);
        self.active = id;
        debug!(session = %id, turns = self.active_turns.len(), "session loaded");
    }

    /// Removes a session and its stored transcript.
    ///
    /// Deleting the active session activates the most recent remaining one,
    /// or a fresh draft when none remain.
    pub fn delete_session(
        &mut self,
        store: &mut dyn KeyValueStore,
        id: SessionId,
        _confirmed: Confirmed,
    ) -> Result<(), EngineError> {
        if !self.contains(id) {
            return Err(EngineError::UnknownSession(id));
        }

        store.remove(&id.key())?;
        self.persisted.remove(&id);
        debug!(session = %id, "session deleted");

        if self.active == id {
            self.activate_fallback(store);
        }
        Ok(())
    }

    /// Removes every entry in the session namespace. Preference keys survive.
    ///
    /// Returns the number of removed entries. When a removal fails, sessions
    /// removed so far are dropped from the listing before the error returns.
    pub fn delete_all(
        &mut self,
        store: &mut dyn KeyValueStore,
        _confirmed: Confirmed,
    ) -> Result<usize, EngineError> {
        let session_keys: Vec<String> = store
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(SESSION_KEY_PREFIX))
            .collect();

        let mut active_removed = false;
        for key in &session_keys {
            if let Err(error) = store.remove(key) {
                warn!(key = %key, error = %error, "delete-all stopped partway");
                if active_removed {
                    self.activate_fallback(store);
                }
                return Err(error.into());
            }
            if let Some(id) = SessionId::from_key(key) {
                self.persisted.remove(&id);
                active_removed |= id == self.active;
            }
        }

        self.persisted.clear();
        self.active_turns.clear();
        self.active = self.allocate_id();
        debug!(removed = session_keys.len(), "all sessions deleted");
        Ok(session_keys.len())
    }

    /// Appends `turn` to session `id`.
    ///
    /// Returns `Ok(false)` without writing when `id` no longer resolves to a
    /// session, e.g. it was deleted while a reply was pending.
    pub fn append_turn(
        &mut self,
        store: &mut dyn KeyValueStore,
        id: SessionId,
        turn: Turn,
    ) -> Result<bool, EngineError> {
        if !self.contains(id) {
            debug!(session = %id, "append skipped, session no longer exists");
            return Ok(false);
        }

        if id == self.active {
            let mut turns = self.active_turns.clone();
            turns.push(turn);
            write_turns(store, id, &turns)?;
            self.active_turns = turns;
        } else {
            let mut turns = read_turns(store, id);
            turns.push(turn);
            write_turns(store, id, &turns)?;
        }

        self.persisted.insert(id);
        Ok(true)
    }

    /// Committed transcript of any session, for export.
    #[must_use]
    pub fn transcript(&self, store: &dyn KeyValueStore, id: SessionId) -> Vec<Turn> {
        if id == self.active {
            self.active_turns.clone()
        } else {
            read_turns(store, id)
        }
    }

    fn activate_fallback(&mut self, store: &dyn KeyValueStore) {
        match self.persisted.last().copied() {
            Some(latest) => self.load_session(store, latest),
            None => {
                self.active = self.allocate_id();
                self.active_turns.clear();
            }
        }
    }

    fn allocate_id(&mut self) -> SessionId {
        let mut millis = self.clock.now_millis();
        if let Some(last) = self.last_issued {
            if millis <= last.millis() {
                millis = last.millis().saturating_add(1);
            }
        }
        while self.persisted.contains(&SessionId::from_millis(millis)) {
            millis = millis.saturating_add(1);
        }

        let id = SessionId::from_millis(millis);
        self.last_issued = Some(id);
        id
    }
}

fn read_turns(store: &dyn KeyValueStore, id: SessionId) -> Vec<Turn> {
    let raw = match store.get(&id.key()) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(error) => {
            warn!(session = %id, error = %error, "session read failed, treating as empty");
            return Vec::new();
        }
    };

    decode_turns(&raw).unwrap_or_else(|error| {
        warn!(session = %id, error = %error, "session data unreadable, treating as empty");
        Vec::new()
    })
}

fn write_turns(store: &mut dyn KeyValueStore, id: SessionId, turns: &[Turn]) -> Result<(), EngineError> {
    let key = id.key();
    let encoded = encode_turns(turns).map_err(|source| EngineError::Encode {
        key: key.clone(),
        source,
    })?;
    store.set(&key, &encoded)?;
    Ok(())
}
