//! Error types for the leaderboard layer.

use qiba_protocol::{TableId, UserId};
use qiba_store::StoreError;

/// Errors that can occur while filing or reading scores.
#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    /// The table was never created.
    #[error("leaderboard {0} not found")]
    TableNotFound(TableId),

    /// The player has no entry on this table.
    #[error("player {0} has no entry on the leaderboard")]
    UserNotRanked(UserId),

    /// Any other store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LeaderboardError {
    /// Maps a store lookup failure for `table` into a domain error.
    pub(crate) fn from_lookup(table: &TableId, err: StoreError) -> Self {
        if err.is_not_found() {
            Self::TableNotFound(table.clone())
        } else {
            Self::Store(err)
        }
    }
}
