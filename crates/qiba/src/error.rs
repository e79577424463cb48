//! Unified error type for the Qiba server.

use qiba_leaderboard::LeaderboardError;
use qiba_ledger::LedgerError;
use qiba_protocol::ProtocolError;
use qiba_session::{SealError, SessionError};
use qiba_store::StoreError;
use qiba_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum QibaError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Leaderboard(#[from] LeaderboardError),

    #[error(transparent)]
    Seal(#[from] SealError),

    /// A configuration value is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl QibaError {
    /// The HTTP-style status code sent to clients in an `Error` payload.
    ///
    /// - 400: the request itself was bad
    /// - 404: the session, user, table or referral record doesn't exist
    /// - 409: an entity with this id already exists
    /// - 503: a store is unavailable
    /// - 500: everything else
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Protocol(ProtocolError::Encode(_)) => 500,
            Self::Protocol(_) => 400,
            Self::Store(e) => store_status(e),
            Self::Session(e) => match e {
                SessionError::NotFound(_) | SessionError::Ended(_) => 404,
                SessionError::Leaderboard(e) => leaderboard_status(e),
                SessionError::Store(e) => store_status(e),
                SessionError::FinalizeFailed { .. }
                | SessionError::Seal(_)
                | SessionError::Serialize(_) => 500,
            },
            Self::Ledger(e) => match e {
                LedgerError::UserNotFound(_) | LedgerError::ReferralNotFound(_) => 404,
                LedgerError::Store(e) => store_status(e),
            },
            Self::Leaderboard(e) => leaderboard_status(e),
            Self::Transport(_) | Self::Seal(_) | Self::Config(_) => 500,
        }
    }
}

fn store_status(err: &StoreError) -> u16 {
    match err {
        StoreError::NotFound { .. } => 404,
        StoreError::AlreadyExists { .. } => 409,
        StoreError::Unavailable(_) => 503,
    }
}

fn leaderboard_status(err: &LeaderboardError) -> u16 {
    match err {
        LeaderboardError::TableNotFound(_) | LeaderboardError::UserNotRanked(_) => 404,
        LeaderboardError::Store(e) => store_status(e),
    }
}
