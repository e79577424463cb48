//! `QibaServer` builder and server loop.
//!
//! This is the entry point for running a Qiba game server. It ties the
//! layers together: transport → protocol → service.

use std::net::SocketAddr;
use std::sync::Arc;

use qiba_protocol::{Codec, JsonCodec};
use qiba_store::{Clock, SystemClock};
use qiba_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{GameService, QibaError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) service: GameService,
    pub(crate) codec: C,
    pub(crate) clock: Arc<dyn Clock>,
}

/// Builder for configuring and starting a Qiba server.
///
/// # Example
///
/// ```rust,ignore
/// use qiba::prelude::*;
///
/// let server = QibaServer::builder()
///     .config(ServerConfig::from_env()?)
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct QibaServerBuilder {
    bind_addr: Option<String>,
    config: ServerConfig,
    service: Option<GameService>,
}

impl QibaServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: None,
            config: ServerConfig::default(),
            service: None,
        }
    }

    /// Sets the address to bind to, overriding `config.bind_addr`.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = Some(addr.to_owned());
        self
    }

    /// Sets the server configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Serves an already-built service instead of a fresh in-memory one.
    pub fn service(mut self, service: GameService) -> Self {
        self.service = Some(service);
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<QibaServer<JsonCodec>, QibaError> {
        let service = match self.service {
            Some(service) => service,
            None => GameService::in_memory(&self.config)?,
        };
        let addr = self.bind_addr.unwrap_or(self.config.bind_addr);
        let transport = WebSocketTransport::bind(&addr).await?;

        let state = Arc::new(ServerState {
            service,
            codec: JsonCodec,
            clock: Arc::new(SystemClock),
        });

        Ok(QibaServer { transport, state })
    }
}

impl Default for QibaServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Qiba server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct QibaServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl QibaServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> QibaServerBuilder {
        QibaServerBuilder::new()
    }
}

impl<C: Codec> QibaServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, QibaError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the accept loop, spawning a handler task per connection.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), QibaError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Qiba server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
