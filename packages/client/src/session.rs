//! One WebSocket session against the Huddle server.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use huddle_server::infrastructure::dto::websocket::{ClientEvent, EventFrame};
use huddle_shared::time::get_timestamp_millis;
use tokio::{
    net::TcpStream,
    sync::{Mutex, mpsc},
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Error as WsError, protocol::Message},
};

use crate::{
    command::{ClientCommand, HELP},
    error::ClientError,
    session_adapter::{AdapterAction, ClientSessionAdapter},
};

use super::{formatter::MessageFormatter, ui::redisplay_prompt};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Run one session until the user quits or the connection ends.
///
/// Returns `Ok(())` only when the user closed the session (`/quit`, Ctrl+C, Ctrl+D).
pub async fn run_client_session(
    url: &str,
    token: &str,
    persistent_threshold: u32,
    input: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let url = format!("{}?token={}", url, token);

    let (ws_stream, _response) = connect_async(&url).await.map_err(|e| match e {
        WsError::Http(response) => ClientError::HandshakeRejected(response.status().as_u16()),
        other => ClientError::ConnectionError(other.to_string()),
    })?;

    tracing::info!("Connected to session server");
    println!("\nType /help for commands. Press Ctrl+C to exit.\n");

    let (mut write, mut read) = ws_stream.split();
    let adapter = Arc::new(Mutex::new(ClientSessionAdapter::new(persistent_threshold)));
    let adapter_for_read = adapter.clone();

    // Spawn a task to handle incoming frames
    let mut read_task = tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let Ok(frame) = serde_json::from_str::<EventFrame>(text.as_str()) else {
                        print!("{}", MessageFormatter::format_raw_message(text.as_str()));
                        redisplay_prompt();
                        continue;
                    };
                    print!("{}", MessageFormatter::format_event(&frame));

                    let actions = adapter_for_read.lock().await.handle(&frame);
                    for action in actions {
                        if let Some(line) = MessageFormatter::format_action(&action) {
                            print!("{}", line);
                        }
                        if let AdapterAction::Reauthenticate { code, reason } = action {
                            return Err(ClientError::SessionTerminated {
                                code,
                                message: reason,
                            });
                        }
                    }
                    redisplay_prompt();
                }
                Ok(Message::Binary(data)) => {
                    print!("{}", MessageFormatter::format_binary_message(data.len()));
                    redisplay_prompt();
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed the connection");
                    return Err(ClientError::ConnectionLost(
                        "server closed the connection".to_string(),
                    ));
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    return Err(ClientError::ConnectionLost(e.to_string()));
                }
                _ => {}
            }
        }
        Err(ClientError::ConnectionLost("stream ended".to_string()))
    });

    // If either side completes, the other one is dropped
    tokio::select! {
        read_result = &mut read_task => {
            read_result.unwrap_or_else(|e| Err(ClientError::ConnectionLost(e.to_string())))
        }
        write_result = write_loop(&mut write, input, &adapter) => {
            read_task.abort();
            write_result
        }
    }
}

/// Send commands typed by the user until they quit or the input closes
async fn write_loop(
    write: &mut WsSink,
    input: &mut mpsc::UnboundedReceiver<String>,
    adapter: &Mutex<ClientSessionAdapter>,
) -> Result<(), ClientError> {
    while let Some(line) = input.recv().await {
        let event = match ClientCommand::parse(&line) {
            Ok(ClientCommand::Send(event)) => event,
            Ok(ClientCommand::Help) => {
                println!("{}", HELP);
                redisplay_prompt();
                continue;
            }
            Ok(ClientCommand::Quit) => break,
            Err(message) => {
                println!("{}", message);
                redisplay_prompt();
                continue;
            }
        };

        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize event: {}", e);
                continue;
            }
        };
        if let Err(e) = write.send(Message::text(json)).await {
            tracing::warn!("Failed to send event: {}", e);
            return Err(ClientError::ConnectionLost(e.to_string()));
        }
        if let ClientEvent::LeaveRoom(payload) = &event {
            adapter.lock().await.leave_project(&payload.room_id);
        }

        print!("{}", MessageFormatter::format_sent_confirmation(get_timestamp_millis()));
        redisplay_prompt();
    }

    write.send(Message::Close(None)).await.ok();
    Ok(())
}
