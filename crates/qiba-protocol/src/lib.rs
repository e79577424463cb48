//! Wire protocol and domain records for the Qiba game core.
//!
//! This crate defines the "language" every other layer speaks:
//!
//! - **Records** ([`Session`], [`SpawnedObject`], [`User`], [`ScoreEntry`],
//!   [`Referral`], ...): the data the stores hold and the wire carries.
//! - **Messages** ([`Envelope`], [`Request`], [`Response`]): the RPC surface.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how envelopes become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Service (sessions, ledgers, ranking)
//! ```

mod codec;
mod error;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{Envelope, Payload, Request, Response};
pub use types::{
    DisplayTotal, LeaderboardTable, ObjectId, ObjectKind, Profile, RankedEntry,
    Referral, ReferralEdge, ScoreEntry, SealedPayload, Session, SessionId,
    SpawnedObject, TableId, User, UserId,
};
