//! The session manager: runs play sessions from start to final score.
//!
//! ## Lifecycle
//!
//! ```text
//! start_session() ──→ [Created] ──→ spawn_next() / tap() ... ──→ end_session()
//!                                                                   │
//!                                                                   ▼
//!                                                    [Ended] ──→ leaderboard
//! ```
//!
//! Every call reads the session from the [`GameStore`], changes it, and
//! writes it back. The manager itself holds no session state, so any
//! number of connection tasks can share one manager behind an `Arc`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use qiba_leaderboard::LeaderboardRanker;
use qiba_protocol::{
    ObjectId, ObjectKind, Profile, SealedPayload, Session, SessionId,
    SpawnedObject, User,
};
use qiba_store::{Clock, GameStore, StoreError, UserStore};
use rand::Rng;

use crate::{SessionConfig, SessionError, Sealer};

/// What a client gets back when its session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedSession {
    pub session_id: SessionId,
    /// The sealed object list at start time (always empty).
    pub sealed: SealedPayload,
}

/// Runs play sessions.
pub struct SessionManager {
    games: Arc<dyn GameStore>,
    users: Arc<dyn UserStore>,
    leaderboard: Arc<LeaderboardRanker>,
    sealer: Arc<dyn Sealer>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(
        games: Arc<dyn GameStore>,
        users: Arc<dyn UserStore>,
        leaderboard: Arc<LeaderboardRanker>,
        sealer: Arc<dyn Sealer>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        Self {
            games,
            users,
            leaderboard,
            sealer,
            clock,
            config,
        }
    }

    /// The config this manager was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Starts a session for `owner`.
    ///
    /// Persists an empty session, registers the player if this is their
    /// first visit, and seals the (still empty) object list. The seal is
    /// taken once here and never refreshed as objects are spawned.
    ///
    /// Eligibility is not checked here; callers ask the eligibility ledger
    /// first.
    pub fn start_session(
        &self,
        owner: Profile,
    ) -> Result<StartedSession, SessionError> {
        let session = Session::new(owner.id, self.clock.now());
        self.games.create(&session)?;
        self.users.ensure(&User::new(owner))?;

        let payload = serde_json::to_vec(&session.objects)?;
        let sealed = self.sealer.seal(&payload)?;

        tracing::info!(session_id = %session.id, user = %session.owner, "session started");
        Ok(StartedSession {
            session_id: session.id,
            sealed,
        })
    }

    /// Appends one new object to the session and returns it.
    ///
    /// The kind is a fair coin flip. The object becomes tappable at the
    /// current server time and is returned in the clear so the client can
    /// draw it right away.
    pub fn spawn_next(&self, id: SessionId) -> Result<SpawnedObject, SessionError> {
        let kind = if rand::rng().random_bool(0.5) {
            ObjectKind::Reward
        } else {
            ObjectKind::Penalty
        };
        let object = SpawnedObject {
            id: ObjectId::new(),
            kind,
            activation_time: self.clock.now(),
        };

        self.modify_live(id, |session| session.objects.push(object.clone()))
            .map_err(|e| lookup_error(id, e))?
            .ok_or(SessionError::Ended(id))?;

        tracing::debug!(session_id = %id, object_id = %object.id, ?kind, "object spawned");
        Ok(object)
    }

    /// Scores a tap on `object_id`.
    ///
    /// The first object in spawn order with this id whose activation time
    /// has passed, by the server clock, counts: a reward adds
    /// `reward_points`, a penalty subtracts `penalty_points`. `client_time`
    /// is only logged.
    ///
    /// Returns `false` without touching the score when nothing matches.
    /// Objects stay tappable after a hit, so tapping the same object again
    /// scores again.
    pub fn tap(
        &self,
        id: SessionId,
        object_id: ObjectId,
        client_time: DateTime<Utc>,
    ) -> Result<bool, SessionError> {
        let now = self.clock.now();
        let reward = i64::from(self.config.reward_points);
        let penalty = i64::from(self.config.penalty_points);

        let outcome = self
            .modify_live(id, |session| {
                let kind = session
                    .objects
                    .iter()
                    .find(|o| o.id == object_id && o.activation_time <= now)
                    .map(|o| o.kind)?;
                session.score = match kind {
                    ObjectKind::Reward => session.score.saturating_add(reward),
                    ObjectKind::Penalty => session.score.saturating_sub(penalty),
                };
                Some((kind, session.score))
            })
            .map_err(|e| lookup_error(id, e))?
            .ok_or(SessionError::Ended(id))?;

        let Some((kind, score)) = outcome else {
            tracing::debug!(session_id = %id, %object_id, %client_time, "tap missed");
            return Ok(false);
        };

        tracing::debug!(session_id = %id, %object_id, ?kind, score, "tap accepted");
        Ok(true)
    }

    /// Ends the session and files its score on the leaderboard.
    ///
    /// The end time is stamped under the store's lock, so of several
    /// concurrent calls exactly one ends the session and files its score;
    /// the others get [`SessionError::Ended`].
    ///
    /// # Errors
    /// - [`SessionError::FinalizeFailed`] with `score: 0` when the final
    ///   write fails; nothing is filed
    /// - [`SessionError::Leaderboard`] when the session was saved but the
    ///   score could not be filed
    pub fn end_session(&self, id: SessionId) -> Result<i64, SessionError> {
        let now = self.clock.now();

        let ended = self.modify_live(id, |session| {
            session.end_time = Some(now);
            (session.owner, session.score)
        });
        let (owner, score) = match ended {
            Ok(Some(ended)) => ended,
            Ok(None) => return Err(SessionError::Ended(id)),
            Err(e) if e.is_not_found() => return Err(SessionError::NotFound(id)),
            Err(source) => {
                tracing::warn!(session_id = %id, error = %source, "finalize failed, score reset to 0");
                return Err(SessionError::FinalizeFailed {
                    session: id,
                    score: 0,
                    source,
                });
            }
        };

        let profile = match self.users.get(owner) {
            Ok(user) => user.profile,
            Err(e) => {
                tracing::warn!(user = %owner, error = %e, "filing score without profile");
                Profile::anonymous(owner)
            }
        };

        self.leaderboard
            .submit(&self.config.leaderboard_table, profile, score)
            .inspect_err(|e| {
                tracing::error!(session_id = %id, error = %e, "score not filed");
            })?;

        tracing::info!(session_id = %id, score, "session ended");
        Ok(score)
    }

    /// Loads a session by id, ended or not.
    pub fn get(&self, id: SessionId) -> Result<Session, SessionError> {
        self.games.get(id).map_err(|e| lookup_error(id, e))
    }

    /// Runs `apply` on the session under the store's write lock, unless it
    /// has already ended. `Ok(None)` means it had.
    fn modify_live<T>(
        &self,
        id: SessionId,
        mut apply: impl FnMut(&mut Session) -> T,
    ) -> Result<Option<T>, StoreError> {
        let mut outcome = None;
        self.games.modify(id, &mut |session| {
            if !session.is_ended() {
                outcome = Some(apply(session));
            }
        })?;
        Ok(outcome)
    }
}

fn lookup_error(id: SessionId, err: StoreError) -> SessionError {
    if err.is_not_found() {
        SessionError::NotFound(id)
    } else {
        SessionError::Store(err)
    }
}
