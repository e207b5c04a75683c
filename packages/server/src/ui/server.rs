//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::{net::TcpListener, task::JoinHandle};
use tower_http::trace::TraceLayer;

use crate::usecase::{SessionHandle, SessionServices};

use super::{
    handler::{
        get_room_detail, get_rooms, health_check, post_eviction, post_room_event,
        post_user_event, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Session server
///
/// Owns the shared state handed to every handler and the worker that applies
/// commands coming from the CRUD layer.
///
/// # Example
///
/// ```ignore
/// let services = SessionServices::new(&config, repository, message_pusher, collaborators);
/// let server = Server::new(services, config.internal_token.clone());
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
    command_worker: JoinHandle<()>,
}

impl Server {
    /// Create a new Server instance
    ///
    /// Spawns the session command worker, so this must be called inside a Tokio runtime.
    pub fn new(services: SessionServices, internal_token: Option<String>) -> Self {
        let (session_handle, command_worker) = services.start_command_worker();
        let state = Arc::new(AppState {
            connect_session: services.connect,
            disconnect_session: services.disconnect,
            dispatch_event: services.dispatch,
            inspect_rooms: services.inspect,
            session_handle,
            internal_token,
        });
        Self {
            state,
            command_worker,
        }
    }

    /// Handle for pushing commands into the session layer from the same process
    pub fn session_handle(&self) -> SessionHandle {
        self.state.session_handle.clone()
    }

    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/rooms", get(get_rooms))
            .route("/api/rooms/{room_id}", get(get_room_detail))
            // CRUD 層向けの内部エンドポイント
            .route("/internal/rooms/{room_id}/events", post(post_room_event))
            .route("/internal/users/{user_id}/events", post(post_user_event))
            .route("/internal/evictions", post(post_eviction))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the session server until Ctrl+C or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;
        self.serve(listener, shutdown_signal()).await?;
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!("Session server listening on {}", local_addr);
        tracing::info!("Connect to: ws://{}/ws?token=<access token>", local_addr);

        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        self.command_worker.abort();
        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
