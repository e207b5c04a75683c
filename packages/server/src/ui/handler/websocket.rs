//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    domain::{ConnectionId, PushFrame, SessionError},
    infrastructure::dto::conversion::decode_client_event,
    ui::state::AppState,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

/// Authenticates the handshake before upgrading.
///
/// The token is read from `?token=` first, then from an `Authorization: Bearer` header.
/// A rejected handshake never becomes a WebSocket.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let token = query.token.or_else(|| bearer_token(&headers));

    // Create a channel for this connection to receive frames
    let (tx, rx) = mpsc::unbounded_channel();

    let connection = match state.connect_session.execute(token.as_deref(), tx).await {
        Ok(connection) => connection,
        Err(error) => {
            tracing::warn!("Rejected WebSocket handshake: {}", error);
            return Err(rejection_status(&error));
        }
    };

    let connection_id = connection.id;
    tracing::info!(
        %connection_id,
        user_id = %connection.user_id,
        "Connection authenticated, upgrading"
    );

    let cleanup_state = state.clone();
    Ok(ws
        .on_failed_upgrade(move |e| {
            tracing::warn!(%connection_id, "WebSocket upgrade failed: {}", e);
            tokio::spawn(async move {
                cleanup_state
                    .disconnect_session
                    .execute(&connection_id)
                    .await;
            });
        })
        .on_upgrade(move |socket| handle_socket(socket, state, connection_id, rx)))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

fn rejection_status(error: &SessionError) -> StatusCode {
    match error {
        SessionError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        SessionError::AccountInactive => StatusCode::FORBIDDEN,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Spawns a task that forwards frames from the rx channel to the WebSocket sender.
///
/// The loop ends after a close frame, or once the pusher drops the channel.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<PushFrame>,
    mut sender: SplitSink<WebSocket, Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let (message, closing) = match frame {
                PushFrame::Text(text) => (Message::Text(text.into()), false),
                PushFrame::Ping => (Message::Ping(Bytes::new()), false),
                PushFrame::Close { code, reason } => (
                    Message::Close(Some(CloseFrame {
                        code,
                        reason: reason.into(),
                    })),
                    true,
                ),
            };
            if sender.send(message).await.is_err() || closing {
                break;
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    connection_id: ConnectionId,
    rx: mpsc::UnboundedReceiver<PushFrame>,
) {
    let (sender, mut receiver) = socket.split();
    let state_clone = state.clone();

    // Spawn a task to receive frames from this connection
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(%connection_id, "WebSocket error: {}", e);
                    break;
                }
            };

            // Any inbound frame, pongs included, proves liveness
            if !state_clone.dispatch_event.touch(&connection_id).await {
                break;
            }

            let decoded = match msg {
                Message::Text(text) => decode_client_event(text.as_str()),
                Message::Binary(_) => Err(SessionError::MalformedEvent(
                    "binary frames are not supported".to_string(),
                )),
                Message::Ping(_) | Message::Pong(_) => continue,
                Message::Close(_) => {
                    tracing::info!(%connection_id, "Client requested close");
                    break;
                }
            };

            if let Err(error) = state_clone
                .dispatch_event
                .execute(&connection_id, decoded)
                .await
                && error.is_fatal()
            {
                break;
            }
        }
    });

    // Spawn a task to push frames from the session layer to this connection
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    if let Some(rooms) = state.disconnect_session.execute(&connection_id).await {
        tracing::info!(
            %connection_id,
            rooms = rooms.len(),
            "Connection closed and removed from the registry"
        );
    }
}
