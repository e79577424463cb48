//! Error types for the session layer.

use qiba_leaderboard::LeaderboardError;
use qiba_protocol::SessionId;
use qiba_store::StoreError;

use crate::SealError;

/// Errors that can occur while running a play session.
///
/// A tap that misses (wrong object, or not active yet) is not an error;
/// [`SessionManager::tap`](crate::SessionManager::tap) returns `false`.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists with this id.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The session already ended. Ended sessions accept no further calls.
    #[error("session {0} has already ended")]
    Ended(SessionId),

    /// The end-of-game write failed. `score` is always 0: a score that
    /// never reached the store is not reported.
    #[error("failed to finalize session {session} (score reset to {score})")]
    FinalizeFailed {
        session: SessionId,
        score: i64,
        #[source]
        source: StoreError,
    },

    /// Sealing the session payload failed.
    #[error(transparent)]
    Seal(#[from] SealError),

    /// The session payload could not be serialized for sealing.
    #[error("failed to serialize session payload: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Filing the final score failed.
    #[error(transparent)]
    Leaderboard(#[from] LeaderboardError),

    /// Any other store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
