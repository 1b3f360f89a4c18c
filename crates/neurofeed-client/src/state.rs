//! Client-visible connection state.

use crate::buffer::EventBuffer;

/// Connection flags and the single-slot error.
///
/// Transient: reset on every `connect()` and whenever the socket closes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionState {
    /// The socket handshake completed and the socket is still open.
    pub is_connected: bool,
    /// The server accepted the registration frame.
    pub is_registered: bool,
    /// Most recent error; replaced by the next one.
    pub error: Option<String>,
}

impl ConnectionState {
    /// Clear both flags, keeping the error.
    pub fn mark_closed(&mut self) {
        self.is_connected = false;
        self.is_registered = false;
    }
}

/// Everything the dispatcher mutates.
#[derive(Clone, Debug, Default)]
pub struct FeedState {
    /// Connection flags and error.
    pub connection: ConnectionState,
    /// Recent events.
    pub events: EventBuffer,
}
