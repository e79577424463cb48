//! Core records for the Qiba game core.
//!
//! Everything in this module is plain data: the identities that key the
//! stores, and the records those stores hold. All of it derives serde,
//! because every record eventually travels on the wire (a spawned object
//! is disclosed to the client the moment it exists, leaderboard entries are
//! shipped for display, and so on).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// This is a "newtype wrapper" around the numeric account id the client
/// platform hands us. Wrapping it means a `UserId` can never be passed
/// where a `SessionId` is expected, even though both are just numbers or
/// uuids underneath.
///
/// `#[serde(transparent)]` serializes this as the bare `i64`, so
/// `UserId(42)` is `42` in JSON rather than `{"0":42}`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// A unique identifier for one play session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generates a fresh random (v4) session id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// A unique identifier for a spawned object inside a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    /// Generates a fresh random (v4) object id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O-{}", self.0)
    }
}

/// The name of a leaderboard table, e.g. `"qiba"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(pub String);

impl TableId {
    /// Creates a table id from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the table name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// The public face of a player: who they are and what to call them.
///
/// Names are optional because the client platform may omit any of them.
/// Leaderboards resolve a display name from these fields, see
/// [`Profile::display_name`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// The player's account id.
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl Profile {
    /// A profile carrying only the id, for players we know nothing else about.
    pub fn anonymous(id: UserId) -> Self {
        Self {
            id,
            username: None,
            first_name: None,
            last_name: None,
        }
    }

    /// Resolves the name shown on leaderboards.
    ///
    /// Priority is `username`, then `first_name`, then `last_name`; blank
    /// strings count as missing. A profile with no usable name falls back to
    /// the id's display form (`U-42`).
    pub fn display_name(&self) -> String {
        [&self.username, &self.first_name, &self.last_name]
            .into_iter()
            .flatten()
            .map(|name| name.trim())
            .find(|name| !name.is_empty())
            .map_or_else(|| self.id.to_string(), str::to_owned)
    }
}

/// A stored player record.
///
/// `#[serde(flatten)]` inlines the profile fields, so the JSON shape is
/// `{ "id": 1, "username": "...", "bonus_credits": 0, ... }` rather than a
/// nested `profile` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub profile: Profile,
    /// Extra plays earned through referrals or granted by an operator.
    ///
    /// Unsigned, so the "never negative" rule is enforced by the type:
    /// decrements go through `checked_sub`.
    #[serde(default)]
    pub bonus_credits: u32,
}

impl User {
    /// A brand-new user with no bonus credits.
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            bonus_credits: 0,
        }
    }

    /// Shorthand for `self.profile.id`.
    pub fn id(&self) -> UserId {
        self.profile.id
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Whether tapping an object earns or costs points.
///
/// Chosen by an unbiased coin flip when the object spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ObjectKind {
    Reward,
    Penalty,
}

/// A tappable object the server spawned into a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnedObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    /// Server time at which the object becomes tappable.
    pub activation_time: DateTime<Utc>,
}

/// One play of the game, from start to end.
///
/// ```text
///   Created ──(spawn / tap)*──→ Ended
/// ```
///
/// `objects` grows by one per spawn, `score` changes only through validated
/// taps, and `end_time` is set exactly once. A session with `end_time` set
/// is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub owner: UserId,
    pub objects: Vec<SpawnedObject>,
    pub score: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Session {
    /// A fresh session with no objects and a zero score.
    pub fn new(owner: UserId, start_time: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            owner,
            objects: Vec::new(),
            score: 0,
            start_time,
            end_time: None,
        }
    }

    /// Returns `true` once `end_time` has been set.
    pub fn is_ended(&self) -> bool {
        self.end_time.is_some()
    }

    /// The moment this session last occupied its owner's play window:
    /// the end time if it ended, otherwise the start time.
    pub fn window_anchor(&self) -> DateTime<Utc> {
        self.end_time.unwrap_or(self.start_time)
    }
}

/// The output of sealing a payload: an opaque representation plus an
/// integrity tag that can be verified against it.
///
/// Both fields are base64 text so they survive any wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPayload {
    /// `base64(nonce ‖ ciphertext)`.
    pub data: String,
    /// `base64(HMAC-SHA256(nonce ‖ ciphertext))`.
    pub tag: String,
}

// ---------------------------------------------------------------------------
// Leaderboards
// ---------------------------------------------------------------------------

/// A finalized session score on a leaderboard. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub user: Profile,
    pub score: i64,
    pub timestamp: DateTime<Utc>,
}

/// A score entry together with its 1-based position in the ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub rank: usize,
    pub entry: ScoreEntry,
}

/// A named collection of score entries.
///
/// Entries are stored in append order. Ranking is recomputed from
/// `(score, timestamp)` on every read; the stored order carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardTable {
    pub id: TableId,
    pub entries: Vec<ScoreEntry>,
}

impl LeaderboardTable {
    /// An empty table.
    pub fn new(id: TableId) -> Self {
        Self {
            id,
            entries: Vec::new(),
        }
    }
}

/// A display name and the sum of every score filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayTotal {
    pub name: String,
    pub total: i64,
}

// ---------------------------------------------------------------------------
// Referrals
// ---------------------------------------------------------------------------

/// One `from → to` referral.
///
/// An edge starts pending when an invite is recorded, or is created already
/// accepted when the referred player signs up without a prior invite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralEdge {
    pub from: UserId,
    pub to: UserId,
    pub accepted: bool,
    pub accept_time: Option<DateTime<Utc>>,
}

impl ReferralEdge {
    /// Returns `true` if this edge links exactly `from → to`.
    pub fn links(&self, from: UserId, to: UserId) -> bool {
        self.from == from && self.to == to
    }
}

/// Every referral made by one owner (the referrer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub owner: UserId,
    pub edges: Vec<ReferralEdge>,
    pub created_at: DateTime<Utc>,
}

impl Referral {
    /// An empty referral record for `owner`.
    pub fn new(owner: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            owner,
            edges: Vec::new(),
            created_at,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
