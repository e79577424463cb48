//! Collaborator contracts for the Qiba game core.
//!
//! The core never owns its data. Sessions, users, leaderboards and referral
//! records all live behind the store traits defined here, and "now" comes
//! from an injected [`Clock`]. That split lets the same core run against
//! the in-memory stores in this crate (development, tests) or a durable
//! database adapter, without the core knowing which.
//!
//! # Key types
//!
//! - [`GameStore`], [`UserStore`], [`LeaderboardStore`], [`ReferralStore`]:
//!   the repository traits
//! - [`MemoryGameStore`] and friends: `parking_lot::RwLock`-guarded maps
//! - [`Clock`]: [`SystemClock`] in production, [`ManualClock`] in tests
//! - [`StoreError`]: what a store reports when a read or write fails
//!
//! # Atomicity
//!
//! Stores serialize mutations to the *same* entity. Where the core needs a
//! read-modify-write to be atomic (bonus credits, referral edges,
//! leaderboard appends) the trait exposes a single call that does the whole
//! cycle under the store's lock rather than separate get and save calls.

mod clock;
mod error;
mod game;
mod leaderboard;
mod referral;
mod user;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::StoreError;
pub use game::{GameStore, MemoryGameStore};
pub use leaderboard::{LeaderboardStore, MemoryLeaderboardStore};
pub use referral::{MemoryReferralStore, ReferralStore};
pub use user::{MemoryUserStore, UserStore};
