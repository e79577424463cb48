//! The leaderboard service: files final scores and answers ranking queries.

use std::sync::Arc;

use qiba_protocol::{
    DisplayTotal, LeaderboardTable, Profile, RankedEntry, ScoreEntry, TableId,
    UserId,
};
use qiba_store::{Clock, LeaderboardStore, StoreError};

use crate::LeaderboardError;
use crate::ranking;

/// A leaderboard read for one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standings {
    /// The top of the ranking.
    pub top: Vec<ScoreEntry>,
    /// The player's best entry, whether or not it made the top list.
    pub user_entry: Option<RankedEntry>,
}

/// Binds the [`ranking`] functions to a store.
///
/// Every read loads the table and re-ranks it; nothing is cached, so a
/// score filed a moment ago is visible on the very next read.
pub struct LeaderboardRanker {
    store: Arc<dyn LeaderboardStore>,
    clock: Arc<dyn Clock>,
}

impl LeaderboardRanker {
    /// Creates a ranker over `store`, stamping new entries with `clock`.
    pub fn new(store: Arc<dyn LeaderboardStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Creates the table if it doesn't exist yet. Idempotent.
    pub fn ensure_table(&self, id: &TableId) -> Result<(), LeaderboardError> {
        match self.store.create(&LeaderboardTable::new(id.clone())) {
            Ok(()) => {
                tracing::info!(table = %id, "leaderboard created");
                Ok(())
            }
            Err(StoreError::AlreadyExists { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Appends one entry to the table.
    ///
    /// Goes through the store's atomic append, so concurrent inserts from
    /// sessions ending at the same instant are all kept.
    pub fn insert(
        &self,
        table: &TableId,
        entry: ScoreEntry,
    ) -> Result<(), LeaderboardError> {
        self.store
            .append_entry(table, entry)
            .map_err(|e| LeaderboardError::from_lookup(table, e))
    }

    /// Files a final score for `user`, timestamped now, and returns the
    /// entry as stored.
    pub fn submit(
        &self,
        table: &TableId,
        user: Profile,
        score: i64,
    ) -> Result<ScoreEntry, LeaderboardError> {
        let entry = ScoreEntry {
            user,
            score,
            timestamp: self.clock.now(),
        };
        self.insert(table, entry.clone())?;
        tracing::info!(
            table = %table,
            user_id = %entry.user.id,
            score,
            "score filed"
        );
        Ok(entry)
    }

    /// Every entry of the table in ranked order.
    pub fn rank(
        &self,
        table: &TableId,
    ) -> Result<Vec<ScoreEntry>, LeaderboardError> {
        Ok(ranking::rank(&self.load(table)?.entries))
    }

    /// The first `n` entries of [`rank`](Self::rank).
    pub fn top_n(
        &self,
        table: &TableId,
        n: usize,
    ) -> Result<Vec<ScoreEntry>, LeaderboardError> {
        Ok(ranking::top_n(&self.load(table)?.entries, n))
    }

    /// The player's best entry and its rank.
    ///
    /// # Errors
    /// [`LeaderboardError::UserNotRanked`] if the player has no entry.
    pub fn find_user_entry(
        &self,
        table: &TableId,
        user: UserId,
    ) -> Result<RankedEntry, LeaderboardError> {
        ranking::find_user_entry(&self.load(table)?.entries, user)
            .ok_or(LeaderboardError::UserNotRanked(user))
    }

    /// The leaderboard view a player sees: the top `n`, plus their own
    /// position when they have one.
    pub fn standings(
        &self,
        table: &TableId,
        user: UserId,
        n: usize,
    ) -> Result<Standings, LeaderboardError> {
        // One load for both halves, so the top list and the player's rank
        // come from the same snapshot.
        let entries = self.load(table)?.entries;
        Ok(Standings {
            top: ranking::top_n(&entries, n),
            user_entry: ranking::find_user_entry(&entries, user),
        })
    }

    /// Scores summed per display name, highest total first.
    pub fn aggregate_totals(
        &self,
        table: &TableId,
    ) -> Result<Vec<DisplayTotal>, LeaderboardError> {
        Ok(ranking::aggregate_totals(&self.load(table)?.entries))
    }

    fn load(&self, table: &TableId) -> Result<LeaderboardTable, LeaderboardError> {
        self.store
            .get(table)
            .map_err(|e| LeaderboardError::from_lookup(table, e))
    }
}
