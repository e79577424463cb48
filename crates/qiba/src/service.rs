//! The game service: one method per RPC.
//!
//! [`GameService`] owns the session manager, both ledgers and the
//! leaderboard ranker, all sharing the same stores and clock. The
//! connection handler decodes a [`Request`], calls [`GameService::handle`],
//! and encodes whatever comes back; nothing in here knows about sockets.

use std::sync::Arc;

use qiba_leaderboard::LeaderboardRanker;
use qiba_ledger::{
    EligibilityLedger, LedgerError, ReferralLedger, ReferralOutcome,
};
use qiba_protocol::{Profile, Request, Response, TableId, User, UserId};
use qiba_session::{AesGcmSealer, Sealer, SessionManager};
use qiba_store::{
    Clock, GameStore, LeaderboardStore, MemoryGameStore, MemoryLeaderboardStore,
    MemoryReferralStore, MemoryUserStore, ReferralStore, SystemClock, UserStore,
};

use crate::{QibaError, ServerConfig};

/// The four repositories the core runs on.
#[derive(Clone)]
pub struct Stores {
    pub games: Arc<dyn GameStore>,
    pub users: Arc<dyn UserStore>,
    pub leaderboards: Arc<dyn LeaderboardStore>,
    pub referrals: Arc<dyn ReferralStore>,
}

impl Stores {
    /// Fresh in-memory stores.
    pub fn in_memory() -> Self {
        Self {
            games: Arc::new(MemoryGameStore::new()),
            users: Arc::new(MemoryUserStore::new()),
            leaderboards: Arc::new(MemoryLeaderboardStore::new()),
            referrals: Arc::new(MemoryReferralStore::new()),
        }
    }
}

/// The RPC facade over the game core.
pub struct GameService {
    sessions: SessionManager,
    eligibility: Arc<EligibilityLedger>,
    referrals: ReferralLedger,
    leaderboard: Arc<LeaderboardRanker>,
    users: Arc<dyn UserStore>,
    table: TableId,
    game_duration_secs: u32,
    leaderboard_limit: usize,
}

impl GameService {
    /// Wires the core together and creates the configured leaderboard
    /// table if it doesn't exist yet.
    pub fn new(
        stores: Stores,
        sealer: Arc<dyn Sealer>,
        clock: Arc<dyn Clock>,
        config: &ServerConfig,
    ) -> Result<Self, QibaError> {
        let leaderboard = Arc::new(LeaderboardRanker::new(
            stores.leaderboards,
            Arc::clone(&clock),
        ));
        let table = config.session.leaderboard_table.clone();
        leaderboard.ensure_table(&table)?;

        let eligibility = Arc::new(EligibilityLedger::new(
            Arc::clone(&stores.games),
            Arc::clone(&stores.users),
            Arc::clone(&clock),
            config.eligibility.clone(),
        ));
        let referrals = ReferralLedger::new(
            stores.referrals,
            Arc::clone(&stores.users),
            Arc::clone(&eligibility),
            Arc::clone(&clock),
        );
        let sessions = SessionManager::new(
            stores.games,
            Arc::clone(&stores.users),
            Arc::clone(&leaderboard),
            sealer,
            clock,
            config.session.clone(),
        );

        Ok(Self {
            sessions,
            eligibility,
            referrals,
            leaderboard,
            users: stores.users,
            table,
            game_duration_secs: config.session.game_duration_secs,
            leaderboard_limit: config.leaderboard_limit,
        })
    }

    /// A service over fresh in-memory stores and the system clock, sealing
    /// with the configured key or a generated one.
    pub fn in_memory(config: &ServerConfig) -> Result<Self, QibaError> {
        let sealer = match config.seal_key {
            Some(key) => AesGcmSealer::new(key),
            None => {
                tracing::warn!("QIBA_SEAL_KEY not set, sealing with a random key");
                AesGcmSealer::generate()
            }
        };
        Self::new(
            Stores::in_memory(),
            Arc::new(sealer),
            Arc::new(SystemClock),
            config,
        )
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn eligibility(&self) -> &EligibilityLedger {
        &self.eligibility
    }

    pub fn referrals(&self) -> &ReferralLedger {
        &self.referrals
    }

    pub fn leaderboard(&self) -> &LeaderboardRanker {
        &self.leaderboard
    }

    /// Executes one request.
    pub fn handle(&self, request: Request) -> Result<Response, QibaError> {
        let response = match request {
            // -- Session lifecycle --
            Request::StartGame { user } => {
                let started = self.sessions.start_session(user)?;
                Response::GameStarted {
                    session_id: started.session_id,
                    sealed: started.sealed,
                }
            }
            Request::Spawn { session_id } => Response::Spawned {
                object: self.sessions.spawn_next(session_id)?,
            },
            Request::Tap {
                session_id,
                object_id,
                timestamp,
            } => Response::Tapped {
                accepted: self.sessions.tap(session_id, object_id, timestamp)?,
            },
            Request::EndGame { session_id } => Response::GameEnded {
                score: self.sessions.end_session(session_id)?,
            },
            Request::GameTime => Response::GameTime {
                seconds: self.game_duration_secs,
            },

            // -- Eligibility --
            Request::CanPlay { user_id } => Response::CanPlay {
                allowed: self.eligibility.can_start(user_id)?,
            },
            Request::MaxPlays { user_id } => Response::MaxPlays {
                value: self.eligibility.max_plays_allowed(user_id)?,
            },
            Request::PlaysLeft { user_id } => Response::PlaysLeft {
                value: self.eligibility.plays_remaining_today(user_id)?,
            },
            Request::BonusCredits { user_id } => Response::BonusCredits {
                count: self.eligibility.bonus_credits(user_id)?,
            },
            Request::GrantBonus { user_id } => Response::BonusCredits {
                count: self.eligibility.grant_bonus_credit(user_id)?,
            },
            Request::AddUser { user } => {
                self.add_user(user)?;
                Response::UserAdded
            }

            // -- Leaderboard --
            Request::Leaderboard { user_id, limit } => {
                let n = limit.unwrap_or(self.leaderboard_limit);
                let standings = self.leaderboard.standings(&self.table, user_id, n)?;
                Response::Leaderboard {
                    entries: standings.top,
                    user_entry: standings.user_entry,
                }
            }
            Request::LeaderboardTotals => Response::LeaderboardTotals {
                totals: self.leaderboard.aggregate_totals(&self.table)?,
            },

            // -- Referrals --
            Request::Referral { user } => {
                let owner = user.id;
                self.add_user(user)?;
                self.referrals.ensure_referral_record(owner)?;
                Response::ReferralRegistered
            }
            Request::Invite { from, to } => Response::Invited {
                recorded: self.referrals.invite(from, to)?,
            },
            Request::AcceptReferral { from, to } => {
                let referred = to.id;
                self.add_user(to)?;
                let outcome = self.referrals.record_referral(from, referred)?;
                Response::ReferralAccepted {
                    granted: outcome == ReferralOutcome::Recorded,
                }
            }
            Request::ReferralStatistics { user_id } => self.referral_statistics(user_id)?,
        };
        Ok(response)
    }

    fn add_user(&self, profile: Profile) -> Result<(), QibaError> {
        self.users.ensure(&User::new(profile))?;
        Ok(())
    }

    fn referral_statistics(&self, user: UserId) -> Result<Response, QibaError> {
        let count = match self.referrals.count_referrals(user) {
            Ok(count) => count,
            Err(LedgerError::ReferralNotFound(_)) => 0,
            Err(e) => return Err(e.into()),
        };
        Ok(Response::ReferralStatistics {
            count,
            bonus_count: self.eligibility.bonus_credits(user)?,
        })
    }
}
