//! Leaderboard ranking for the Qiba game core.
//!
//! Two layers:
//!
//! - [`ranking`]: pure functions over a slice of [`ScoreEntry`], covering the total
//!   order, top-N, "where is this player", and per-name totals.
//! - [`LeaderboardRanker`] binds those functions to a
//!   [`LeaderboardStore`](qiba_store::LeaderboardStore) and a clock, and is
//!   what the session layer hands final scores to.
//!
//! # Ordering
//!
//! Score descending; equal scores rank the *more recent* entry first. The
//! ranking is recomputed from `(score, timestamp)` on every read, so the
//! order entries were appended in never matters.
//!
//! [`ScoreEntry`]: qiba_protocol::ScoreEntry

mod error;
mod ranker;
pub mod ranking;

pub use error::LeaderboardError;
pub use ranker::{LeaderboardRanker, Standings};
