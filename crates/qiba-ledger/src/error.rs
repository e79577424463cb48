//! Error types for the ledger layer.

use qiba_protocol::UserId;
use qiba_store::StoreError;

/// Errors that can occur while reading or adjusting play quotas.
///
/// A player who may not play right now is not an error: the eligibility
/// queries answer `false` or `0` instead.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The player has no user record.
    #[error("user {0} not found")]
    UserNotFound(UserId),

    /// The player was never registered as a referrer.
    #[error("no referral record for user {0}")]
    ReferralNotFound(UserId),

    /// Any other store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub(crate) fn user(id: UserId, err: StoreError) -> Self {
        if err.is_not_found() {
            Self::UserNotFound(id)
        } else {
            Self::Store(err)
        }
    }

    pub(crate) fn referral(owner: UserId, err: StoreError) -> Self {
        if err.is_not_found() {
            Self::ReferralNotFound(owner)
        } else {
            Self::Store(err)
        }
    }
}
