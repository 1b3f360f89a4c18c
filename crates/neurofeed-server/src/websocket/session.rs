//! WebSocket session lifecycle, from upgrade through disconnect.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::broadcast::BroadcastManager;
use super::connection::ClientConnection;
use super::handler::handle_frame;

/// Run a WebSocket session for one client.
///
/// Inbound text frames are answered through the same outbound queue that
/// fan-out uses, so replies and events share one ordering. The session ends
/// when the client closes, the socket errors, or `shutdown` fires.
#[instrument(skip_all, fields(conn_id = %connection_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    connection_id: String,
    broadcast: Arc<BroadcastManager>,
    send_queue: usize,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(send_queue);
    let connection = Arc::new(ClientConnection::new(connection_id, send_tx));

    info!("client connected");
    broadcast.add(Arc::clone(&connection)).await;

    let outbound_cancel = shutdown.child_token();
    let outbound_token = outbound_cancel.clone();
    let outbound = tokio::spawn(async move {
        loop {
            tokio::select! {
                msg = send_rx.recv() => match msg {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                () = outbound_token.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let reply = handle_frame(&connection, text.as_str());
                    let _ = connection.send_message(&reply);
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!("client closed");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "websocket read error");
                    break;
                }
            },
            () = shutdown.cancelled() => {
                debug!("server shutting down");
                break;
            }
        }
    }

    broadcast.remove(&connection.id).await;
    outbound_cancel.cancel();
    let _ = outbound.await;
    info!(
        age_ms = u64::try_from(connection.age().as_millis()).unwrap_or(u64::MAX),
        dropped = connection.drop_count(),
        "client disconnected"
    );
}
