//! Play-quota bookkeeping for the Qiba game core.
//!
//! Two ledgers live here:
//!
//! 1. **Eligibility** ([`EligibilityLedger`]): may a player start a session
//!    now, how many plays they have left, and their bonus-credit balance.
//! 2. **Referrals** ([`ReferralLedger`]): who referred whom, crediting the
//!    referrer one bonus play per first-time accepted referral.
//!
//! # How it fits in the stack
//!
//! ```text
//! Service (above)  ← asks CanPlay / PlaysLeft, records referrals
//!     ↕
//! Ledger (this crate)  ← cooldown windows and bonus credits
//!     ↕
//! Store (below)  ← sessions, users, referral records, clock
//! ```

mod config;
mod eligibility;
mod error;
mod referral;

pub use config::EligibilityConfig;
pub use eligibility::{EligibilityLedger, EligibilityState};
pub use error::LedgerError;
pub use referral::{ReferralLedger, ReferralOutcome};
