//! Client error types.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Error recorded in the connection state for any socket-level failure.
///
/// The underlying transport error is logged, not surfaced to the UI.
pub const SOCKET_ERROR_MESSAGE: &str = "WebSocket connection error";

/// Error recorded when the server rejects the registration handshake.
pub const REGISTRATION_FAILED_MESSAGE: &str = "Failed to register with neurofeedback server";

/// Errors from feed client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The operation needs a user ID and the client was built without one.
    #[error("user ID is required")]
    MissingUserId,

    /// The configured base URL could not be turned into an endpoint URL.
    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// WebSocket handshake or send failed.
    #[error("websocket transport error: {0}")]
    Transport(#[source] Box<tungstenite::Error>),

    /// HTTP request could not be sent or its body could not be read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("{path} returned status {status}: {body}")]
    Status {
        /// Request path.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// A frame could not be encoded.
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<tungstenite::Error> for ClientError {
    fn from(err: tungstenite::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

impl ClientError {
    /// Whether the failure happened before any I/O was attempted.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::MissingUserId | Self::InvalidUrl { .. })
    }
}
