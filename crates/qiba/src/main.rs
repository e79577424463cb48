//! `qiba-server`: the Qiba game server binary.
//!
//! Configuration comes from the environment (see [`ServerConfig::from_env`]);
//! log verbosity from `RUST_LOG`, defaulting to `info`.

use qiba::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), QibaError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        table = %config.session.leaderboard_table,
        cooldown_secs = config.eligibility.cooldown_secs,
        "starting qiba-server"
    );

    let server = QibaServer::builder().config(config).build().await?;
    server.run().await
}
