//! Server configuration, loaded from environment variables.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use qiba_ledger::EligibilityConfig;
use qiba_protocol::TableId;
use qiba_session::{KEY_LEN, SessionConfig};

use crate::QibaError;

/// Complete server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// Key for sealing session payloads. `None` means a random key is
    /// generated at startup, so sealed payloads don't survive a restart.
    pub seal_key: Option<[u8; KEY_LEN]>,
    pub session: SessionConfig,
    pub eligibility: EligibilityConfig,
    /// Top-N used by leaderboard reads that don't ask for a limit.
    pub leaderboard_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_owned(),
            seal_key: None,
            session: SessionConfig::default(),
            eligibility: EligibilityConfig::default(),
            leaderboard_limit: 100,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `QIBA_BIND_ADDR` -- listen address (default `0.0.0.0:8080`)
    /// - `PORT` -- listen port on all interfaces, when `QIBA_BIND_ADDR` is unset
    /// - `QIBA_SEAL_KEY` -- base64 of a 32-byte seal key (default: random)
    /// - `QIBA_LEADERBOARD_TABLE` -- leaderboard scores are filed to (default `qiba`)
    /// - `QIBA_COOLDOWN_SECS` -- wait between free plays (default 30)
    /// - `QIBA_GAME_DURATION_SECS` -- session length shown to clients (default 10)
    /// - `QIBA_LEADERBOARD_LIMIT` -- default top-N (default 100)
    pub fn from_env() -> Result<Self, QibaError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, QibaError> {
        let defaults = Self::default();

        let bind_addr = match (lookup("QIBA_BIND_ADDR"), lookup("PORT")) {
            (Some(addr), _) => addr,
            (None, Some(port)) => {
                let port: u16 = parse("PORT", &port)?;
                format!("0.0.0.0:{port}")
            }
            (None, None) => defaults.bind_addr,
        };

        let seal_key = lookup("QIBA_SEAL_KEY")
            .map(|encoded| decode_key(&encoded))
            .transpose()?;

        let mut session = defaults.session;
        if let Some(table) = lookup("QIBA_LEADERBOARD_TABLE") {
            if table.trim().is_empty() {
                return Err(QibaError::Config(
                    "QIBA_LEADERBOARD_TABLE must not be empty".into(),
                ));
            }
            session.leaderboard_table = TableId::new(table);
        }
        if let Some(secs) = lookup("QIBA_GAME_DURATION_SECS") {
            session.game_duration_secs = parse("QIBA_GAME_DURATION_SECS", &secs)?;
        }

        let mut eligibility = defaults.eligibility;
        if let Some(secs) = lookup("QIBA_COOLDOWN_SECS") {
            eligibility.cooldown_secs = parse("QIBA_COOLDOWN_SECS", &secs)?;
        }

        let leaderboard_limit = match lookup("QIBA_LEADERBOARD_LIMIT") {
            Some(limit) => parse("QIBA_LEADERBOARD_LIMIT", &limit)?,
            None => defaults.leaderboard_limit,
        };

        Ok(Self {
            bind_addr,
            seal_key,
            session,
            eligibility,
            leaderboard_limit,
        })
    }
}

fn parse<T>(name: &str, value: &str) -> Result<T, QibaError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| QibaError::Config(format!("invalid {name}: {e}")))
}

fn decode_key(encoded: &str) -> Result<[u8; KEY_LEN], QibaError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| QibaError::Config(format!("invalid QIBA_SEAL_KEY: {e}")))?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        QibaError::Config(format!(
            "invalid QIBA_SEAL_KEY: expected {KEY_LEN} bytes, got {len}"
        ))
    })
}
