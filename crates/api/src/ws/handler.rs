use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shipwatch_core::error::CoreError;
use shipwatch_core::identity::Identity;
use shipwatch_core::rooms::equipment_room;
use shipwatch_events::protocol::EVENT_PONG;
use shipwatch_events::{ClientMessage, Envelope};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// HTTP handler that authenticates, then upgrades to WebSocket.
///
/// The token comes from `?token=` or, failing that, a Bearer header.
/// Authentication runs before the upgrade so a rejected handshake leaves
/// no registry state behind.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> AppResult<Response> {
    let token = params.token.or_else(|| {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string)
    });

    let identity = state
        .registry
        .authenticate(token.as_deref())
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "WebSocket handshake rejected");
            AppError::Core(CoreError::Unauthorized(e.to_string()))
        })?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state, identity))
        .into_response())
}

/// Manage a single connection after upgrade.
///
///   1. Register with the registry and replay the user's offline buffer.
///   2. Spawn a sender task that forwards registry frames to the sink.
///   3. Process inbound client messages on the current task.
///   4. Unregister on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState, identity: Identity) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let user_id = identity.user_id;
    tracing::info!(conn_id = %conn_id, user_id, "WebSocket connected");

    let registry = state.registry.clone();
    let mut rx = registry.register(conn_id.clone(), identity).await;

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
            Ok(Message::Text(text)) => handle_client_message(&state, &conn_id, text.as_str()).await,
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

    registry.unregister(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, user_id, "WebSocket disconnected");
}

async fn handle_client_message(state: &AppState, conn_id: &str, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(conn_id, error = %e, "Ignoring unrecognised client message");
            return;
        }
    };

    match message {
        ClientMessage::Subscribe { equipment_id } => {
            let id = state.equipment_cache.normalize(&equipment_id).await;
            state.registry.join_room(conn_id, &equipment_room(&id)).await;
            tracing::debug!(conn_id, equipment_id = %id, "Subscribed to equipment");
        }
        ClientMessage::Unsubscribe { equipment_id } => {
            let id = state.equipment_cache.normalize(&equipment_id).await;
            state.registry.leave_room(conn_id, &equipment_room(&id)).await;
            tracing::debug!(conn_id, equipment_id = %id, "Unsubscribed from equipment");
        }
        ClientMessage::Ping => {
            let pong = Envelope::new(EVENT_PONG, serde_json::json!({}));
            state.registry.send_to_connection(conn_id, &pong).await;
        }
    }
}
