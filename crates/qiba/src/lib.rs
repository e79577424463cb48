//! # Qiba
//!
//! Server-authoritative core of a casual tap game.
//!
//! The client only draws. The server decides when a session starts, which
//! objects appear, whether a tap counts, what the final score is, and who
//! may play next. Each of those rules lives in its own crate; this one
//! wires them into a [`GameService`] and serves it over WebSocket.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qiba::prelude::*;
//!
//! # async fn start() -> Result<(), QibaError> {
//! let server = QibaServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .config(ServerConfig::default())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;
mod service;

pub use config::ServerConfig;
pub use error::QibaError;
pub use server::{QibaServer, QibaServerBuilder};
pub use service::{GameService, Stores};

/// Everything a server binary or an embedding application needs.
pub mod prelude {
    pub use crate::{GameService, QibaError, QibaServer, QibaServerBuilder, ServerConfig, Stores};

    pub use qiba_leaderboard::{LeaderboardError, LeaderboardRanker, Standings};
    pub use qiba_ledger::{
        EligibilityConfig, EligibilityLedger, EligibilityState, LedgerError, ReferralLedger,
        ReferralOutcome,
    };
    pub use qiba_protocol::{
        Codec, DisplayTotal, Envelope, JsonCodec, ObjectId, ObjectKind, Payload, Profile,
        ProtocolError, RankedEntry, Request, Response, ScoreEntry, SealedPayload, Session,
        SessionId, SpawnedObject, TableId, User, UserId,
    };
    pub use qiba_session::{AesGcmSealer, SealError, Sealer, SessionConfig, SessionError, SessionManager};
    pub use qiba_store::{Clock, ManualClock, StoreError, SystemClock};
    pub use qiba_transport::TransportError;
}
