//! Play sessions for the Qiba game core.
//!
//! This crate owns the part of the game the client must not be trusted
//! with:
//!
//! 1. **Session lifecycle**: start, spawn, tap, end ([`SessionManager`])
//! 2. **Tap validation**: server time decides whether an object was live
//! 3. **Sealing**: tamper-evident session payloads ([`Sealer`] trait,
//!    [`AesGcmSealer`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Service (above)  ← one call per RPC
//!     ↕
//! Session (this crate)  ← state machine, scoring, sealing
//!     ↕
//! Leaderboard + Store (below)  ← final scores, persisted sessions
//! ```

mod config;
mod error;
mod manager;
mod seal;

pub use config::SessionConfig;
pub use error::SessionError;
pub use manager::{SessionManager, StartedSession};
pub use seal::{AesGcmSealer, KEY_LEN, SealError, Sealer, generate_key};
