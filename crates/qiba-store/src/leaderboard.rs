//! Leaderboard persistence.

use std::collections::HashMap;

use parking_lot::RwLock;
use qiba_protocol::{LeaderboardTable, ScoreEntry, TableId};

use crate::StoreError;

const KIND: &str = "leaderboard";

/// Stores leaderboard tables.
pub trait LeaderboardStore: Send + Sync + 'static {
    /// Loads a table by id.
    fn get(&self, id: &TableId) -> Result<LeaderboardTable, StoreError>;

    /// Persists a new table.
    ///
    /// # Errors
    /// [`StoreError::AlreadyExists`] if a table with this id exists.
    fn create(&self, table: &LeaderboardTable) -> Result<(), StoreError>;

    /// Appends one entry to a table.
    ///
    /// This is a single atomic operation: two sessions finishing at the same
    /// moment both land in the table. Never emulate it with `get` followed
    /// by `replace`, which loses whichever append writes first.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if the table doesn't exist.
    fn append_entry(
        &self,
        id: &TableId,
        entry: ScoreEntry,
    ) -> Result<(), StoreError>;

    /// Overwrites a whole table (administrative use).
    fn replace(&self, table: &LeaderboardTable) -> Result<(), StoreError>;
}

/// An in-memory [`LeaderboardStore`].
#[derive(Debug, Default)]
pub struct MemoryLeaderboardStore {
    tables: RwLock<HashMap<TableId, LeaderboardTable>>,
}

impl MemoryLeaderboardStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LeaderboardStore for MemoryLeaderboardStore {
    fn get(&self, id: &TableId) -> Result<LeaderboardTable, StoreError> {
        self.tables
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(KIND, id))
    }

    fn create(&self, table: &LeaderboardTable) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if tables.contains_key(&table.id) {
            return Err(StoreError::already_exists(KIND, &table.id));
        }
        tables.insert(table.id.clone(), table.clone());
        Ok(())
    }

    fn append_entry(
        &self,
        id: &TableId,
        entry: ScoreEntry,
    ) -> Result<(), StoreError> {
        // The write lock spans the lookup and the push, so the append is
        // atomic with respect to every other append on this store.
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(KIND, id))?;
        table.entries.push(entry);
        Ok(())
    }

    fn replace(&self, table: &LeaderboardTable) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let slot = tables
            .get_mut(&table.id)
            .ok_or_else(|| StoreError::not_found(KIND, &table.id))?;
        *slot = table.clone();
        Ok(())
    }
}
