//! Per-connection handler: decode, dispatch, reply.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is a plain request/response loop:
//!   1. Receive an envelope carrying a `Request`
//!   2. Run it through the [`GameService`](crate::GameService)
//!   3. Reply with the same `seq`: a `Response`, or an `Error` payload
//!
//! A frame that fails to decode gets an `Error` reply with `seq` 0; the
//! connection stays open.

use std::sync::Arc;
use std::time::Duration;

use qiba_protocol::{Codec, Envelope, Payload, ProtocolError};
use qiba_transport::{Connection, WebSocketConnection};
use qiba_store::Clock;

use crate::QibaError;
use crate::server::ServerState;

/// Connections that stay silent this long are dropped.
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), QibaError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    loop {
        let data = match tokio::time::timeout(IDLE_TIMEOUT, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection idle, closing");
                let _ = conn.close().await;
                break;
            }
        };

        let envelope: Envelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
                send_error(&conn, &state, 0, &QibaError::Protocol(e)).await?;
                continue;
            }
        };

        let seq = envelope.seq;
        let request = match envelope.payload {
            Payload::Request(request) => request,
            _ => {
                let err = QibaError::Protocol(ProtocolError::InvalidMessage(
                    "expected a Request payload".into(),
                ));
                send_error(&conn, &state, seq, &err).await?;
                continue;
            }
        };

        match state.service.handle(request) {
            Ok(response) => {
                let reply =
                    Envelope::reply(seq, state.clock.now(), Payload::Response(response));
                let bytes = state.codec.encode(&reply)?;
                conn.send(&bytes).await?;
            }
            Err(e) => {
                tracing::debug!(%conn_id, seq, error = %e, "request failed");
                send_error(&conn, &state, seq, &e).await?;
            }
        }
    }

    Ok(())
}

/// Replies to `seq` with an `Error` payload built from `err`.
async fn send_error<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    seq: u64,
    err: &QibaError,
) -> Result<(), QibaError> {
    let envelope = Envelope::reply(
        seq,
        state.clock.now(),
        Payload::Error {
            code: err.status_code(),
            message: err.to_string(),
        },
    );
    let bytes = state.codec.encode(&envelope)?;
    conn.send(&bytes).await?;
    Ok(())
}
