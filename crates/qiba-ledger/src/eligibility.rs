//! The eligibility ledger: free plays, cooldowns and bonus credits.
//!
//! A player gets one free play per cooldown window. The window opens when
//! their most recent session ends (or starts, if it is still running) and
//! closes `cooldown_secs` later. Bonus credits, earned through referrals or
//! granted by an operator, let a player skip the wait: each credit buys
//! exactly one play.
//!
//! ```text
//!          session ends             cooldown elapses
//!               │                          │
//! ──────────────┼──────────────────────────┼──────────→ time
//!               │   only bonus credits     │  free play
//!               │   open a new session     │  available
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use qiba_protocol::{Session, UserId};
use qiba_store::{Clock, GameStore, UserStore};

use crate::{EligibilityConfig, LedgerError};

/// A player's eligibility at a glance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityState {
    /// When the player's most recent session ended. `None` if they never
    /// finished one.
    pub last_session_end: Option<DateTime<Utc>>,
    /// Plays the player can take without waiting for the cooldown.
    pub bonus_credits: u32,
}

/// Per-player play-quota bookkeeping.
///
/// The ledger keeps no state of its own. Session history comes from the
/// [`GameStore`] and the bonus balance from the [`UserStore`], whose
/// `modify` makes every credit and debit a single atomic step.
pub struct EligibilityLedger {
    games: Arc<dyn GameStore>,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    config: EligibilityConfig,
}

impl EligibilityLedger {
    /// Creates a ledger over the given stores.
    pub fn new(
        games: Arc<dyn GameStore>,
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        config: EligibilityConfig,
    ) -> Self {
        Self {
            games,
            users,
            clock,
            config,
        }
    }

    /// The config this ledger was built with.
    pub fn config(&self) -> &EligibilityConfig {
        &self.config
    }

    /// Decides whether `user` may start a session right now.
    ///
    /// - No previous session: always yes.
    /// - A bonus credit available: yes, and one credit is spent. Credits
    ///   are spent before the cooldown is even looked at.
    /// - Otherwise: yes once the cooldown after the last session elapsed.
    pub fn can_start(&self, user: UserId) -> Result<bool, LedgerError> {
        let Some(last) = self.last_session(user)? else {
            tracing::debug!(%user, "first play, allowed");
            return Ok(true);
        };

        if self.consume_if_available(user)? {
            return Ok(true);
        }

        let allowed = self.cooldown_elapsed(&last);
        tracing::debug!(%user, allowed, "cooldown check");
        Ok(allowed)
    }

    /// Plays `user` could take right now without waiting: the free play of
    /// the current window if it is still unused, plus every bonus credit.
    pub fn plays_remaining_today(
        &self,
        user: UserId,
    ) -> Result<u32, LedgerError> {
        let base = match self.last_session(user)? {
            None => 1,
            Some(last) if self.cooldown_elapsed(&last) => 1,
            Some(_) => 0,
        };
        Ok(self.bonus_credits(user)?.saturating_add(base))
    }

    /// The most plays `user` can be offered: one, plus their bonus credits
    /// once they have played at least once.
    pub fn max_plays_allowed(&self, user: UserId) -> Result<u32, LedgerError> {
        if self.last_session(user)?.is_none() {
            return Ok(1);
        }
        Ok(self.bonus_credits(user)?.saturating_add(1))
    }

    /// Adds one bonus credit to `user` and returns the new balance.
    ///
    /// # Errors
    /// [`LedgerError::UserNotFound`] if the player has no user record.
    pub fn grant_bonus_credit(&self, user: UserId) -> Result<u32, LedgerError> {
        let updated = self
            .users
            .modify(user, &mut |u| {
                u.bonus_credits = u.bonus_credits.saturating_add(1);
            })
            .map_err(|e| LedgerError::user(user, e))?;

        tracing::info!(%user, balance = updated.bonus_credits, "bonus credit granted");
        Ok(updated.bonus_credits)
    }

    /// Spends one bonus credit if `user` has any. Returns whether a credit
    /// was spent.
    ///
    /// The check and the decrement happen inside one `modify` call, so two
    /// concurrent calls can never spend the same credit and the balance
    /// never drops below zero. A player without a user record has no
    /// credits to spend.
    pub fn consume_if_available(&self, user: UserId) -> Result<bool, LedgerError> {
        let mut spent = false;
        let result = self.users.modify(user, &mut |u| {
            if let Some(left) = u.bonus_credits.checked_sub(1) {
                u.bonus_credits = left;
                spent = true;
            }
        });

        match result {
            Ok(updated) => {
                if spent {
                    tracing::info!(
                        %user,
                        balance = updated.bonus_credits,
                        "bonus credit spent"
                    );
                }
                Ok(spent)
            }
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// The player's bonus-credit balance; zero if they have no user record.
    pub fn bonus_credits(&self, user: UserId) -> Result<u32, LedgerError> {
        match self.users.get(user) {
            Ok(record) => Ok(record.bonus_credits),
            Err(e) if e.is_not_found() => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Everything the eligibility rules look at, in one read.
    pub fn state(&self, user: UserId) -> Result<EligibilityState, LedgerError> {
        let last_session_end =
            self.last_session(user)?.and_then(|s| s.end_time);
        Ok(EligibilityState {
            last_session_end,
            bonus_credits: self.bonus_credits(user)?,
        })
    }

    fn last_session(&self, user: UserId) -> Result<Option<Session>, LedgerError> {
        Ok(self.games.list_by_owner(user)?.pop())
    }

    fn cooldown_elapsed(&self, last: &Session) -> bool {
        last.window_anchor()
            .checked_add_signed(self.config.cooldown())
            .is_some_and(|ready_at| self.clock.now() >= ready_at)
    }
}
