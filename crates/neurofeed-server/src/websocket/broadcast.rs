//! Event fan-out to registered connections.

use std::collections::HashMap;
use std::sync::Arc;

use neurofeed_core::ServerMessage;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::connection::ClientConnection;

/// Tracks live connections and delivers frames to a user's sockets.
pub struct BroadcastManager {
    /// Connected clients indexed by connection ID.
    connections: RwLock<HashMap<String, Arc<ClientConnection>>>,
}

impl BroadcastManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection.
    pub async fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write().await;
        let _ = conns.insert(connection.id.clone(), connection);
    }

    /// Remove a connection by ID.
    pub async fn remove(&self, connection_id: &str) {
        let mut conns = self.connections.write().await;
        let _ = conns.remove(connection_id);
    }

    /// Send `message` to every connection bound to `user_id`.
    ///
    /// Returns how many connections accepted the frame.
    pub async fn send_to_user(&self, user_id: i64, message: &ServerMessage) -> usize {
        let json = match serde_json::to_string(message) {
            Ok(j) => Arc::new(j),
            Err(e) => {
                warn!(user_id, error = %e, "failed to serialize frame");
                return 0;
            }
        };
        let conns = self.connections.read().await;
        let mut delivered = 0;
        for conn in conns.values().filter(|c| c.user_id() == Some(user_id)) {
            if conn.send(Arc::clone(&json)) {
                delivered += 1;
            } else {
                warn!(conn_id = %conn.id, user_id, "failed to send frame to client");
            }
        }
        debug!(user_id, delivered, "sent frame to user");
        delivered
    }

    /// Number of open connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Number of connections bound to a user.
    pub async fn registered_count(&self) -> usize {
        self.connections
            .read()
            .await
            .values()
            .filter(|c| c.user_id().is_some())
            .count()
    }

    /// Connections bound to `user_id`.
    pub async fn user_connections(&self, user_id: i64) -> Vec<Arc<ClientConnection>> {
        self.connections
            .read()
            .await
            .values()
            .filter(|c| c.user_id() == Some(user_id))
            .cloned()
            .collect()
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_connection(
        id: &str,
        user: Option<i64>,
    ) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(8);
        let conn = ClientConnection::new(id.into(), tx);
        if let Some(user_id) = user {
            conn.bind_user(user_id);
        }
        (Arc::new(conn), rx)
    }

    #[tokio::test]
    async fn add_and_remove() {
        let bm = BroadcastManager::new();
        let (conn, _rx) = make_connection("c1", None);
        bm.add(conn).await;
        assert_eq!(bm.connection_count().await, 1);
        bm.remove("c1").await;
        bm.remove("c1").await;
        assert_eq!(bm.connection_count().await, 0);
    }

    #[tokio::test]
    async fn send_to_user_targets_only_that_user() {
        let bm = BroadcastManager::new();
        let (a1, mut rx_a1) = make_connection("a1", Some(1));
        let (a2, mut rx_a2) = make_connection("a2", Some(1));
        let (b, mut rx_b) = make_connection("b", Some(2));
        let (anon, mut rx_anon) = make_connection("anon", None);
        for conn in [a1, a2, b, anon] {
            bm.add(conn).await;
        }

        let delivered = bm
            .send_to_user(1, &ServerMessage::Error { message: "x".into() })
            .await;

        assert_eq!(delivered, 2);
        assert!(rx_a1.try_recv().is_ok());
        assert!(rx_a2.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
        assert!(rx_anon.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_to_unknown_user_delivers_nothing() {
        let bm = BroadcastManager::new();
        let (conn, _rx) = make_connection("c1", Some(1));
        bm.add(conn).await;
        let delivered = bm
            .send_to_user(99, &ServerMessage::Registered { success: true })
            .await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn registered_count_ignores_unbound() {
        let bm = BroadcastManager::new();
        let (a, _ra) = make_connection("a", Some(1));
        let (b, _rb) = make_connection("b", None);
        bm.add(a).await;
        bm.add(b.clone()).await;
        assert_eq!(bm.registered_count().await, 1);

        b.bind_user(3);
        assert_eq!(bm.registered_count().await, 2);
        assert_eq!(bm.user_connections(3).await.len(), 1);
    }

    #[tokio::test]
    async fn unserializable_frame_is_not_sent() {
        let bm = BroadcastManager::new();
        let (conn, mut rx) = make_connection("c1", Some(1));
        bm.add(conn).await;
        assert_eq!(bm.send_to_user(1, &ServerMessage::Unknown).await, 0);
        assert!(rx.try_recv().is_err());
    }
}
