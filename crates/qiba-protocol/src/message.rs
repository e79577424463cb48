//! Wire messages: the RPC surface of the game core.
//!
//! A client sends an [`Envelope`] carrying a [`Request`]; the server answers
//! with an envelope carrying either a [`Response`] or an error, echoing the
//! request's `seq` so the client can match replies to calls.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ seq: 42                              │  ← echoed in the reply
//! │ timestamp: 1718000000000             │  ← sender's wall clock (ms)
//! │ ┌──────────────────────────────────┐ │
//! │ │ payload: Request(Tap { ... })    │ │
//! │ └──────────────────────────────────┘ │
//! └──────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    DisplayTotal, ObjectId, Profile, RankedEntry, ScoreEntry, SealedPayload,
    SessionId, SpawnedObject, UserId,
};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Client → Server calls.
///
/// `#[serde(tag = "type")]` makes this "internally tagged":
///   `{ "type": "Tap", "session_id": "...", "object_id": "...", ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    // -- Session lifecycle --
    /// Start a new session for this player.
    StartGame { user: Profile },

    /// Spawn the next object into a session.
    Spawn { session_id: SessionId },

    /// Tap an object. `timestamp` is the client's clock; the server only
    /// logs it, its own clock decides.
    Tap {
        session_id: SessionId,
        object_id: ObjectId,
        timestamp: DateTime<Utc>,
    },

    /// Finish a session and file its score.
    EndGame { session_id: SessionId },

    /// How long a session lasts, in seconds.
    GameTime,

    // -- Eligibility --
    /// May this player start a session right now? Consumes a bonus
    /// credit when that is what makes the answer "yes".
    CanPlay { user_id: UserId },

    MaxPlays { user_id: UserId },

    PlaysLeft { user_id: UserId },

    BonusCredits { user_id: UserId },

    /// Operator grant of one bonus credit.
    GrantBonus { user_id: UserId },

    AddUser { user: Profile },

    // -- Leaderboard --
    /// Top of the leaderboard plus the caller's own best entry.
    Leaderboard {
        user_id: UserId,
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Scores summed per display name.
    LeaderboardTotals,

    // -- Referrals --
    /// Register this player as a referrer.
    Referral { user: Profile },

    /// Record a pending invite from `from` to `to`.
    Invite { from: UserId, to: UserId },

    /// `to` accepted a referral from `from`.
    AcceptReferral { from: UserId, to: Profile },

    ReferralStatistics { user_id: UserId },
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Server → Client replies, one variant per [`Request`] family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    GameStarted {
        session_id: SessionId,
        sealed: SealedPayload,
    },

    Spawned { object: SpawnedObject },

    Tapped { accepted: bool },

    GameEnded { score: i64 },

    GameTime { seconds: u32 },

    CanPlay { allowed: bool },

    MaxPlays { value: u32 },

    PlaysLeft { value: u32 },

    BonusCredits { count: u32 },

    UserAdded,

    Leaderboard {
        entries: Vec<ScoreEntry>,
        user_entry: Option<RankedEntry>,
    },

    LeaderboardTotals { totals: Vec<DisplayTotal> },

    ReferralRegistered,

    Invited { recorded: bool },

    /// `granted` is `false` when the referral had already been recorded.
    ReferralAccepted { granted: bool },

    ReferralStatistics { count: usize, bonus_count: u32 },
}

// ---------------------------------------------------------------------------
// Payload & Envelope
// ---------------------------------------------------------------------------

/// The content of an envelope.
///
/// Adjacently tagged, so a call looks like
///   `{ "type": "Request", "data": { "type": "GameTime" } }`
/// and an error like
///   `{ "type": "Error", "data": { "code": 404, "message": "..." } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    Request(Request),
    Response(Response),
    /// `code` follows HTTP conventions (400, 404, 409, 500, 503).
    Error { code: u16, message: String },
}

/// The top-level wire format. Every frame is one envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Caller-chosen sequence number, echoed by the reply.
    pub seq: u64,
    /// Sender's wall clock in milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: i64,
    pub payload: Payload,
}

impl Envelope {
    /// Builds a reply envelope for `seq`, stamped with `now`.
    pub fn reply(seq: u64, now: DateTime<Utc>, payload: Payload) -> Self {
        Self {
            seq,
            timestamp: now.timestamp_millis(),
            payload,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
