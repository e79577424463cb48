//! Session configuration.

use qiba_protocol::TableId;

/// Tunables for [`SessionManager`](crate::SessionManager).
///
/// `Default` gives the live game's values; tests and the server config
/// override individual fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Length of one session as shown to the client, in seconds.
    ///
    /// Default: 10.
    pub game_duration_secs: u32,

    /// Points added for tapping a reward object. Default: 1.
    pub reward_points: u32,

    /// Points taken away for tapping a penalty object. Default: 5.
    pub penalty_points: u32,

    /// The leaderboard final scores are filed to. Default: `qiba`.
    pub leaderboard_table: TableId,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            game_duration_secs: 10,
            reward_points: 1,
            penalty_points: 5,
            leaderboard_table: TableId::new("qiba"),
        }
    }
}
