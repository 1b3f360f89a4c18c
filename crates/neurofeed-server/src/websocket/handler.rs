//! Inbound frame handling.

use neurofeed_core::{ClientMessage, ServerMessage};
use tracing::{debug, info, warn};

use super::connection::ClientConnection;

/// Reply sent for frames that are not a valid client message.
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid message format";

/// Apply one text frame from `connection` and return the reply.
pub fn handle_frame(connection: &ClientConnection, text: &str) -> ServerMessage {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            debug!(conn_id = %connection.id, error = %e, "rejected frame");
            return ServerMessage::Error {
                message: INVALID_FORMAT_MESSAGE.into(),
            };
        }
    };

    match message {
        ClientMessage::Register { user_id } if user_id > 0 => {
            connection.bind_user(user_id);
            info!(conn_id = %connection.id, user_id, "connection registered");
            ServerMessage::Registered { success: true }
        }
        ClientMessage::Register { user_id } => {
            let previous = connection.clear_user();
            warn!(conn_id = %connection.id, user_id, ?previous, "rejected registration");
            ServerMessage::Registered { success: false }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tokio::sync::mpsc;

    fn connection() -> ClientConnection {
        let (tx, _rx) = mpsc::channel(1);
        ClientConnection::new("c".into(), tx)
    }

    #[test]
    fn register_binds_user() {
        let conn = connection();
        let reply = handle_frame(&conn, r#"{"type":"register","userId":42}"#);
        assert_eq!(reply, ServerMessage::Registered { success: true });
        assert_eq!(conn.user_id(), Some(42));
    }

    #[test]
    fn non_positive_user_is_rejected() {
        let conn = connection();
        let reply = handle_frame(&conn, r#"{"type":"register","userId":0}"#);
        assert_eq!(reply, ServerMessage::Registered { success: false });
        assert!(conn.user_id().is_none());
    }

    #[test]
    fn rejected_reregistration_unbinds_user() {
        let conn = connection();
        let _ = handle_frame(&conn, r#"{"type":"register","userId":42}"#);
        let reply = handle_frame(&conn, r#"{"type":"register","userId":-5}"#);
        assert_eq!(reply, ServerMessage::Registered { success: false });
        assert!(conn.user_id().is_none());
    }

    #[test]
    fn garbage_gets_invalid_format() {
        let conn = connection();
        for frame in ["nope", r#"{"type":"subscribe"}"#, r#"{"type":"register"}"#] {
            assert_matches!(
                handle_frame(&conn, frame),
                ServerMessage::Error { message } if message == INVALID_FORMAT_MESSAGE
            );
        }
        assert!(conn.user_id().is_none());
    }
}
