//! Error types for the Huddle client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The server refused the WebSocket handshake
    #[error("Handshake rejected with HTTP status {0}")]
    HandshakeRejected(u16),

    /// Could not establish the connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// An established connection dropped
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// The server sent a fatal `error` event and closed the session
    #[error("Session terminated by server ({code}): {message}")]
    SessionTerminated { code: String, message: String },
}

impl ClientError {
    /// Whether the failure requires new credentials rather than a retry
    pub fn needs_reauthentication(&self) -> bool {
        match self {
            Self::HandshakeRejected(status) => matches!(status, 401 | 403),
            Self::SessionTerminated { code, .. } => {
                matches!(code.as_str(), "unauthenticated" | "account-inactive")
            }
            Self::ConnectionError(_) | Self::ConnectionLost(_) => false,
        }
    }
}
