//! Session persistence.

use std::collections::HashMap;

use parking_lot::RwLock;
use qiba_protocol::{Session, SessionId, UserId};

use crate::StoreError;

const KIND: &str = "session";

/// Stores play sessions.
pub trait GameStore: Send + Sync + 'static {
    /// Persists a new session.
    ///
    /// # Errors
    /// [`StoreError::AlreadyExists`] if the id is taken.
    fn create(&self, session: &Session) -> Result<(), StoreError>;

    /// Loads a session by id.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if no session has this id.
    fn get(&self, id: SessionId) -> Result<Session, StoreError>;

    /// Overwrites an existing session.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if the session was never created.
    fn update(&self, session: &Session) -> Result<(), StoreError>;

    /// Applies `apply` to the stored session as one atomic read-modify-write
    /// and returns the session as it was written back.
    ///
    /// Concurrent calls on the same session run one after the other, each
    /// seeing the previous one's write.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if the session was never created.
    fn modify(
        &self,
        id: SessionId,
        apply: &mut dyn FnMut(&mut Session),
    ) -> Result<Session, StoreError>;

    /// Every session owned by `owner`, oldest first, so the most recent
    /// session is the last element. Sessions that started at the same
    /// instant come back in creation order.
    fn list_by_owner(&self, owner: UserId) -> Result<Vec<Session>, StoreError>;
}

/// An in-memory [`GameStore`].
///
/// A single `RwLock` guards the map: lookups share the read lock, writes
/// take the write lock, so two updates never interleave. Each session is
/// tagged with a creation sequence number to order start-time ties.
#[derive(Debug, Default)]
pub struct MemoryGameStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<SessionId, (u64, Session)>,
    next_seq: u64,
}

impl MemoryGameStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions stored.
    pub fn len(&self) -> usize {
        self.inner.read().sessions.len()
    }

    /// Returns `true` if no sessions are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.read().sessions.is_empty()
    }
}

impl GameStore for MemoryGameStore {
    fn create(&self, session: &Session) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.sessions.contains_key(&session.id) {
            return Err(StoreError::already_exists(KIND, session.id));
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.sessions.insert(session.id, (seq, session.clone()));
        Ok(())
    }

    fn get(&self, id: SessionId) -> Result<Session, StoreError> {
        self.inner
            .read()
            .sessions
            .get(&id)
            .map(|(_, session)| session.clone())
            .ok_or_else(|| StoreError::not_found(KIND, id))
    }

    fn update(&self, session: &Session) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let (_, slot) = inner
            .sessions
            .get_mut(&session.id)
            .ok_or_else(|| StoreError::not_found(KIND, session.id))?;
        *slot = session.clone();
        Ok(())
    }

    fn modify(
        &self,
        id: SessionId,
        apply: &mut dyn FnMut(&mut Session),
    ) -> Result<Session, StoreError> {
        let mut inner = self.inner.write();
        let (_, session) = inner
            .sessions
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(KIND, id))?;
        apply(session);
        Ok(session.clone())
    }

    fn list_by_owner(&self, owner: UserId) -> Result<Vec<Session>, StoreError> {
        let mut owned: Vec<(u64, Session)> = self
            .inner
            .read()
            .sessions
            .values()
            .filter(|(_, s)| s.owner == owner)
            .cloned()
            .collect();
        owned.sort_by_key(|(seq, s)| (s.start_time, *seq));
        Ok(owned.into_iter().map(|(_, s)| s).collect())
    }
}
