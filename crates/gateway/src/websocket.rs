//! Real-time UI channel.
//!
//! The page opens `/websocket?token=…` with the token injected into it. The
//! token is checked before the upgrade; an unknown token never gets a socket.
//! Messages are JSON objects tagged by `event`:
//!
//! ```text
//! server → {"event":"bootstrap","payload":{"user":"alice"}}
//! client → {"event":"ping"}
//! server → {"event":"pong"}
//! ```

use axum::{
    extract::{
        Query, State,
        ws::{
            Message as WsMessage, WebSocket, WebSocketUpgrade,
            rejection::WebSocketUpgradeRejection,
        },
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use portico_core::Principal;
use portico_security::{AuditEvent, AuditOutcome};

use crate::SharedState;

#[derive(Debug, Deserialize)]
pub struct ChannelQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Channel messages in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum ChannelEvent {
    Bootstrap { user: String },
    Ping,
    Pong,
    Error { message: String },
}

/// `GET /websocket?token=…`
pub async fn websocket_handler(
    State(state): State<SharedState>,
    Query(query): Query<ChannelQuery>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let token = query.token.unwrap_or_default();
    let Some(principal) = state.sessions.validate(&token) else {
        state
            .audit
            .log(AuditEvent::ChannelRejected, "anonymous", AuditOutcome::Denied, None);
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    ws.on_upgrade(move |socket| handle_channel(socket, state, principal, token))
}

async fn handle_channel(
    mut socket: WebSocket,
    state: SharedState,
    principal: Principal,
    token: String,
) {
    info!(principal = %principal, "UI channel opened");

    let bootstrap = ChannelEvent::Bootstrap {
        user: principal.name().to_string(),
    };
    if send(&mut socket, &bootstrap).await {
        while let Some(msg) = socket.recv().await {
            let text = match msg {
                Ok(WsMessage::Text(text)) => text,
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => continue, // ignore binary, ping, pong
                Err(_) => break,
            };

            let reply = match serde_json::from_str::<ChannelEvent>(&text) {
                Ok(ChannelEvent::Ping) => ChannelEvent::Pong,
                Ok(other) => ChannelEvent::Error {
                    message: format!("Unexpected event: {other:?}"),
                },
                Err(e) => ChannelEvent::Error {
                    message: format!("Invalid message: {e}"),
                },
            };

            if !send(&mut socket, &reply).await {
                break;
            }
        }
    }

    if state.revoke_on_close && state.sessions.revoke(&token) {
        state
            .audit
            .log(AuditEvent::TokenRevoked, principal.name(), AuditOutcome::Success, None);
    }
    info!(principal = %principal, "UI channel closed");
}

/// Returns false once the peer is gone.
async fn send(socket: &mut WebSocket, event: &ChannelEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            debug!(error = %e, "Failed to encode channel event");
            return true;
        }
    };
    socket.send(WsMessage::Text(json.into())).await.is_ok()
}
