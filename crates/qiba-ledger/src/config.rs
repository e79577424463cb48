//! Eligibility configuration.

use chrono::TimeDelta;

/// Tunables for [`EligibilityLedger`](crate::EligibilityLedger).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityConfig {
    /// Seconds a player waits after a session before the next free play.
    ///
    /// Default: 30.
    pub cooldown_secs: u32,
}

impl EligibilityConfig {
    /// The cooldown as a duration.
    pub fn cooldown(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.cooldown_secs))
    }
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self { cooldown_secs: 30 }
    }
}
