//! WebSocket client connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use neurofeed_core::ServerMessage;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::warn;

/// A connected WebSocket client.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: String,
    /// User bound by a successful `register` frame.
    user_id: Mutex<Option<i64>>,
    /// Send channel to the connection's outbound forwarder.
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Messages dropped because the channel was full or closed.
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a connection that is not yet bound to a user.
    pub fn new(id: String, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id,
            user_id: Mutex::new(None),
            tx,
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Bind this connection to a user. A later registration replaces it.
    pub fn bind_user(&self, user_id: i64) {
        *self.user_id.lock() = Some(user_id);
    }

    /// Drop the binding and return the user it pointed at.
    pub fn clear_user(&self) -> Option<i64> {
        self.user_id.lock().take()
    }

    /// The bound user, if any.
    pub fn user_id(&self) -> Option<i64> {
        *self.user_id.lock()
    }

    /// Queue a text frame. Returns `false` and counts a drop if the
    /// channel is full or closed.
    pub fn send(&self, message: Arc<String>) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Serialize and queue a server frame.
    pub fn send_message(&self, message: &ServerMessage) -> bool {
        match serde_json::to_string(message) {
            Ok(json) => self.send(Arc::new(json)),
            Err(e) => {
                warn!(conn_id = %self.id, error = %e, "failed to serialize frame");
                false
            }
        }
    }

    /// Total messages dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_connection(capacity: usize) -> (ClientConnection, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ClientConnection::new("conn_1".into(), tx), rx)
    }

    #[test]
    fn starts_unbound() {
        let (conn, _rx) = make_connection(4);
        assert_eq!(conn.id, "conn_1");
        assert!(conn.user_id().is_none());
        assert!(conn.age() < Duration::from_secs(1));
    }

    #[test]
    fn rebinding_replaces_user() {
        let (conn, _rx) = make_connection(4);
        conn.bind_user(7);
        conn.bind_user(8);
        assert_eq!(conn.user_id(), Some(8));
    }

    #[test]
    fn clear_user_returns_previous_binding() {
        let (conn, _rx) = make_connection(4);
        conn.bind_user(7);
        assert_eq!(conn.clear_user(), Some(7));
        assert_eq!(conn.user_id(), None);
        assert_eq!(conn.clear_user(), None);
    }

    #[tokio::test]
    async fn send_message_serializes_frame() {
        let (conn, mut rx) = make_connection(4);
        assert!(conn.send_message(&ServerMessage::Registered { success: true }));
        let msg = rx.recv().await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(parsed["type"], "registered");
        assert_eq!(parsed["success"], true);
    }

    #[test]
    fn full_channel_counts_drops() {
        let (conn, _rx) = make_connection(1);
        assert!(conn.send(Arc::new("a".into())));
        assert!(!conn.send(Arc::new("b".into())));
        assert_eq!(conn.drop_count(), 1);
    }

    #[test]
    fn closed_channel_counts_drops() {
        let (conn, rx) = make_connection(4);
        drop(rx);
        assert!(!conn.send(Arc::new("a".into())));
        assert_eq!(conn.drop_count(), 1);
    }
}
