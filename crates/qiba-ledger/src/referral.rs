//! The referral ledger.
//!
//! Each referrer owns one [`Referral`] record holding their `from → to`
//! edges. An edge is pending when the referrer invited someone, and
//! accepted once that player signs up through the referral. Acceptance is
//! what pays: the referrer earns one bonus credit, once per distinct pair.

use std::sync::Arc;

use qiba_protocol::{Referral, ReferralEdge, UserId};
use qiba_store::{Clock, ReferralStore, StoreError, UserStore};

use crate::{EligibilityLedger, LedgerError};

/// What [`ReferralLedger::record_referral`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferralOutcome {
    /// A new acceptance: the referrer was credited.
    Recorded,
    /// The pair was already accepted; nothing changed.
    Duplicate,
}

/// Records referral relationships and credits referrers.
pub struct ReferralLedger {
    referrals: Arc<dyn ReferralStore>,
    users: Arc<dyn UserStore>,
    eligibility: Arc<EligibilityLedger>,
    clock: Arc<dyn Clock>,
}

impl ReferralLedger {
    pub fn new(
        referrals: Arc<dyn ReferralStore>,
        users: Arc<dyn UserStore>,
        eligibility: Arc<EligibilityLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            referrals,
            users,
            eligibility,
            clock,
        }
    }

    /// Returns `owner`'s referral record, creating an empty one first if
    /// they have none. Idempotent.
    pub fn ensure_referral_record(
        &self,
        owner: UserId,
    ) -> Result<Referral, LedgerError> {
        match self.referrals.get(owner) {
            Ok(record) => return Ok(record),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let record = Referral::new(owner, self.clock.now());
        match self.referrals.create(&record) {
            Ok(()) => {
                tracing::info!(%owner, "referral record created");
                Ok(record)
            }
            Err(StoreError::AlreadyExists { .. }) => Ok(self.referrals.get(owner)?),
            Err(e) => Err(e.into()),
        }
    }

    /// Records a pending invite from `from` to `to`.
    ///
    /// Returns `false` if the pair already has an edge, pending or
    /// accepted. Invites never credit anyone.
    ///
    /// # Errors
    /// [`LedgerError::ReferralNotFound`] if `from` is not a registered
    /// referrer.
    pub fn invite(&self, from: UserId, to: UserId) -> Result<bool, LedgerError> {
        let mut recorded = false;
        self.referrals
            .modify(from, &mut |record| {
                if record.edges.iter().any(|e| e.links(from, to)) {
                    return;
                }
                record.edges.push(ReferralEdge {
                    from,
                    to,
                    accepted: false,
                    accept_time: None,
                });
                recorded = true;
            })
            .map_err(|e| LedgerError::referral(from, e))?;

        tracing::debug!(%from, %to, recorded, "invite");
        Ok(recorded)
    }

    /// Records that `to` accepted `from`'s referral and credits `from`.
    ///
    /// A pending invite for the pair is accepted in place; without one a
    /// new accepted edge is appended. A pair that was already accepted is
    /// a [`ReferralOutcome::Duplicate`], not an error, so repeating the
    /// call grants exactly one credit in total.
    ///
    /// If the credit can't be paid, the edge goes back to the state it had
    /// before the call, so a retry can still record it and pay.
    ///
    /// # Errors
    /// - [`LedgerError::UserNotFound`] if `from` has no user record
    /// - [`LedgerError::ReferralNotFound`] if `from` is not a registered
    ///   referrer
    pub fn record_referral(
        &self,
        from: UserId,
        to: UserId,
    ) -> Result<ReferralOutcome, LedgerError> {
        self.users
            .get(from)
            .map_err(|e| LedgerError::user(from, e))?;

        let now = self.clock.now();
        let mut outcome = ReferralOutcome::Duplicate;
        let mut was_pending = false;
        self.referrals
            .modify(from, &mut |record| {
                match record.edges.iter_mut().find(|e| e.links(from, to)) {
                    Some(edge) if edge.accepted => {}
                    Some(edge) => {
                        edge.accepted = true;
                        edge.accept_time = Some(now);
                        outcome = ReferralOutcome::Recorded;
                        was_pending = true;
                    }
                    None => {
                        record.edges.push(ReferralEdge {
                            from,
                            to,
                            accepted: true,
                            accept_time: Some(now),
                        });
                        outcome = ReferralOutcome::Recorded;
                    }
                }
            })
            .map_err(|e| LedgerError::referral(from, e))?;

        if outcome == ReferralOutcome::Duplicate {
            tracing::debug!(%from, %to, "referral already recorded");
            return Ok(outcome);
        }

        if let Err(e) = self.eligibility.grant_bonus_credit(from) {
            tracing::warn!(%from, %to, error = %e, "bonus not granted, undoing referral");
            self.undo_acceptance(from, to, was_pending);
            return Err(e);
        }
        tracing::info!(%from, %to, "referral recorded");
        Ok(outcome)
    }

    /// Puts the `(from, to)` edge back as it was before an acceptance:
    /// pending again if it was an invite, gone if the acceptance created it.
    fn undo_acceptance(&self, from: UserId, to: UserId, was_pending: bool) {
        let undone = self.referrals.modify(from, &mut |record| {
            if was_pending {
                if let Some(edge) = record.edges.iter_mut().find(|e| e.links(from, to)) {
                    edge.accepted = false;
                    edge.accept_time = None;
                }
            } else {
                record.edges.retain(|e| !e.links(from, to));
            }
        });
        if let Err(e) = undone {
            tracing::error!(%from, %to, error = %e, "referral left accepted without a bonus");
        }
    }

    /// Number of edges `owner` has recorded, pending ones included.
    pub fn count_referrals(&self, owner: UserId) -> Result<usize, LedgerError> {
        self.referrals
            .get(owner)
            .map(|record| record.edges.len())
            .map_err(|e| LedgerError::referral(owner, e))
    }
}
