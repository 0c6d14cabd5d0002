use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use easyweb_core::lifecycle::Identity;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::auth::jwt::verify_credential;
use crate::state::AppState;
use crate::ws::gateway::Gateway;

#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// HTTP handler that upgrades the connection to WebSocket.
///
/// The credential comes from the `token` query parameter or the
/// `Authorization` header. A credential that fails verification leaves the
/// connection open but unauthenticated.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let credential = params.token.filter(|t| !t.trim().is_empty()).or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    });

    let identity = credential.as_deref().and_then(|token| {
        let identity = verify_credential(token, &state.config.jwt);
        if identity.is_none() {
            tracing::warn!("WebSocket credential rejected, continuing unauthenticated");
        }
        identity
    });

    ws.on_upgrade(move |socket| handle_socket(socket, state.gateway, identity))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with the gateway.
///   2. Spawns a sender task that forwards messages from the hub channel.
///   3. Dispatches inbound text frames on the current task.
///   4. Cleans up (and announces presence offline) on disconnect.
async fn handle_socket(socket: WebSocket, gateway: Arc<Gateway>, identity: Option<Identity>) {
    let (mut ctx, mut rx) = gateway.connect(identity).await;
    let conn_id = ctx.conn_id.clone();

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => gateway.handle_text(&mut ctx, text.as_str()).await,
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    gateway.disconnect(ctx).await;
    send_task.abort();
}
