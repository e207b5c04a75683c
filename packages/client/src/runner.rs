//! Client execution logic with reconnection support.

use crate::{domain::ReconnectPolicy, error::ClientError};

use super::{session::run_client_session, ui::spawn_readline};

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// WebSocket endpoint of the session server
    pub url: String,
    /// Access token presented at the handshake
    pub token: String,
    pub reconnect: ReconnectPolicy,
    /// Consecutive `rate-limited` errors before they are shown
    pub persistent_threshold: u32,
}

/// Run the client, reconnecting with backoff until the user quits
///
/// # Errors
///
/// Returns the last [`ClientError`] when the server refuses the credentials
/// or every reconnection attempt failed.
pub async fn run_client(options: ClientOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = spawn_readline();
    let mut attempt: u32 = 0;

    loop {
        tracing::info!("Connecting to {} (attempt {})", options.url, attempt + 1);

        let error = match run_client_session(
            &options.url,
            &options.token,
            options.persistent_threshold,
            &mut input,
        )
        .await
        {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                return Ok(());
            }
            Err(error) => error,
        };

        // An established session starts a fresh backoff schedule
        if matches!(
            error,
            ClientError::ConnectionLost(_) | ClientError::SessionTerminated { .. }
        ) {
            attempt = 0;
        }
        attempt += 1;

        let Some(delay) = options.reconnect.next_delay(&error, attempt) else {
            if error.needs_reauthentication() {
                tracing::error!("{}. Obtain a new token to reconnect.", error);
            } else {
                tracing::error!(
                    "Failed to reconnect after {} attempts. Exiting.",
                    options.reconnect.max_attempts
                );
            }
            return Err(error.into());
        };

        tracing::warn!("{}", error);
        tracing::info!(
            "Reconnecting in {:?}... (attempt {}/{})",
            delay,
            attempt,
            options.reconnect.max_attempts
        );
        tokio::time::sleep(delay).await;
    }
}
