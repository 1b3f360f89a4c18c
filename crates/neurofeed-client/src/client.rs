//! Connection manager and simulation trigger.
//!
//! A [`NeurofeedbackClient`] owns at most one WebSocket. `connect()` closes
//! any previous socket, performs the handshake, sends the `register` frame
//! and spawns a single reader task that feeds every inbound frame through
//! [`dispatch_frame`] in arrival order. `disconnect()` and dropping the
//! client both stop that task.
//!
//! Each socket gets a generation number. A reader task only touches the
//! shared state (flags, error and event buffer) while its generation is
//! current, and the check happens under the state lock, so a superseded
//! socket can never clobber the state of its replacement.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use neurofeed_core::constants::SIMULATE_PATH;
use neurofeed_core::{ClientMessage, NeurofeedbackEvent, SimulateRequest};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::dispatcher::{DispatchOutcome, dispatch_frame};
use crate::errors::{ClientError, SOCKET_ERROR_MESSAGE};
use crate::http::{HttpClient, read_json};
use crate::state::{ConnectionState, FeedState};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// How long `disconnect()` waits for the reader task before aborting it.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Caller-supplied hook invoked once per received event, in arrival order.
pub type EventCallback = Arc<dyn Fn(&NeurofeedbackEvent) + Send + Sync>;

/// Real-time neurofeedback feed client.
pub struct NeurofeedbackClient {
    config: ClientConfig,
    http: HttpClient,
    shared: Arc<Shared>,
    socket: AsyncMutex<Option<SocketLink>>,
}

/// State shared between the client handle and its reader task.
struct Shared {
    state: Mutex<FeedState>,
    state_tx: watch::Sender<ConnectionState>,
    generation: AtomicU64,
    on_event: Option<EventCallback>,
}

/// The live socket: its reader task and the token that stops it.
struct SocketLink {
    generation: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl NeurofeedbackClient {
    /// Create a client with no event callback.
    pub fn new(config: ClientConfig) -> Self {
        Self::build(config, None)
    }

    /// Create a client that calls `callback` for every received event.
    pub fn with_callback<F>(config: ClientConfig, callback: F) -> Self
    where
        F: Fn(&NeurofeedbackEvent) + Send + Sync + 'static,
    {
        Self::build(config, Some(Arc::new(callback)))
    }

    fn build(config: ClientConfig, on_event: Option<EventCallback>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::default());
        Self {
            config,
            http: HttpClient::default(),
            shared: Arc::new(Shared {
                state: Mutex::new(FeedState::default()),
                state_tx,
                generation: AtomicU64::new(0),
                on_event,
            }),
            socket: AsyncMutex::new(None),
        }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Snapshot of the connection flags and error.
    pub fn state(&self) -> ConnectionState {
        self.shared.state.lock().connection.clone()
    }

    /// Whether the socket is open.
    pub fn is_connected(&self) -> bool {
        self.shared.state.lock().connection.is_connected
    }

    /// Whether the server accepted the registration.
    pub fn is_registered(&self) -> bool {
        self.shared.state.lock().connection.is_registered
    }

    /// The most recent error, if any.
    pub fn error(&self) -> Option<String> {
        self.shared.state.lock().connection.error.clone()
    }

    /// Buffered events, newest first.
    pub fn events(&self) -> Vec<NeurofeedbackEvent> {
        self.shared.state.lock().events.to_vec()
    }

    /// The most recently received event.
    pub fn latest_event(&self) -> Option<NeurofeedbackEvent> {
        self.shared.state.lock().events.latest().cloned()
    }

    /// Receiver that observes every connection state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Whether the client holds a socket whose reader is still running.
    pub async fn has_socket(&self) -> bool {
        self.socket
            .lock()
            .await
            .as_ref()
            .is_some_and(|link| !link.task.is_finished())
    }

    /// Open the socket and register.
    ///
    /// Any previously opened socket is closed first. Without a user ID this
    /// records an error and returns without touching the network.
    #[instrument(skip(self), fields(user_id = ?self.config.user_id))]
    pub async fn connect(&self) -> Result<(), ClientError> {
        let Some(user_id) = self.config.user_id else {
            warn!("cannot connect without a user ID");
            return Err(self.shared.reject(ClientError::MissingUserId));
        };
        let url = self
            .config
            .socket_url()
            .map_err(|e| self.shared.reject(e))?;
        let register = serde_json::to_string(&ClientMessage::Register { user_id })?;

        let mut socket = self.socket.lock().await;
        if let Some(previous) = socket.take() {
            debug!(generation = previous.generation, "closing previous socket");
            previous.close().await;
        }

        let generation = self.shared.begin_generation();
        debug!(%url, generation, "opening websocket");

        let ws = match connect_async(url.as_str()).await {
            Ok((ws, _response)) => ws,
            Err(e) => {
                warn!(error = %e, "websocket handshake failed");
                self.shared.transport_failed(generation);
                return Err(e.into());
            }
        };
        let (mut sink, source) = ws.split();
        let _ = self
            .shared
            .update_if_current(generation, |state| state.connection.is_connected = true);
        info!(generation, "websocket connected");

        if let Err(e) = sink.send(Message::Text(register.into())).await {
            warn!(error = %e, "failed to send registration frame");
            self.shared.transport_failed(generation);
            return Err(e.into());
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(read_loop(
            sink,
            source,
            Arc::clone(&self.shared),
            generation,
            cancel.clone(),
        ));
        *socket = Some(SocketLink {
            generation,
            cancel,
            task,
        });
        Ok(())
    }

    /// Close the socket and clear the reference. Idempotent.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) {
        let mut socket = self.socket.lock().await;
        if let Some(link) = socket.take() {
            link.close().await;
            info!("websocket disconnected");
        }
        self.shared.update(|state| state.connection.mark_closed());
    }

    /// Ask the server to synthesize an event for this client's user.
    ///
    /// Returns the created event. Failures are recorded as the current
    /// error; there is no timeout and no retry.
    #[instrument(skip(self), fields(user_id = ?self.config.user_id))]
    pub async fn simulate_event(
        &self,
        brain_region_id: &str,
        intensity: Option<f64>,
    ) -> Result<NeurofeedbackEvent, ClientError> {
        let Some(user_id) = self.config.user_id else {
            warn!("cannot simulate an event without a user ID");
            return Err(self.shared.reject(ClientError::MissingUserId));
        };
        let request = SimulateRequest {
            user_id,
            brain_region_id: brain_region_id.to_owned(),
            intensity,
        };

        match self.post_simulation(&request).await {
            Ok(event) => {
                debug!(event_id = event.id, "simulated event created");
                Ok(event)
            }
            Err(e) => {
                warn!(error = %e, "simulation request failed");
                self.shared
                    .record_error(format!("Failed to simulate event: {e}"));
                Err(e)
            }
        }
    }

    async fn post_simulation(
        &self,
        request: &SimulateRequest,
    ) -> Result<NeurofeedbackEvent, ClientError> {
        let url = self.config.endpoint(SIMULATE_PATH)?;
        let response = self.http.client()?.post(url).json(request).send().await?;
        read_json(response).await
    }
}

impl Drop for NeurofeedbackClient {
    fn drop(&mut self) {
        if let Some(link) = self.socket.get_mut().take() {
            link.cancel.cancel();
        }
    }
}

impl Shared {
    /// Mutate the state and publish the new connection snapshot.
    fn update<R>(&self, f: impl FnOnce(&mut FeedState) -> R) -> R {
        let mut state = self.state.lock();
        let result = f(&mut state);
        let _ = self.state_tx.send_replace(state.connection.clone());
        result
    }

    /// Run `f` only while `generation` is the live socket. The generation is
    /// read under the state lock, so `begin_generation` cannot interleave.
    fn update_if_current<R>(
        &self,
        generation: u64,
        f: impl FnOnce(&mut FeedState) -> R,
    ) -> Option<R> {
        self.update(|state| {
            if self.generation.load(Ordering::SeqCst) == generation {
                Some(f(state))
            } else {
                debug!(generation, "ignoring update from superseded socket");
                None
            }
        })
    }

    /// Start a new socket generation with fresh connection state.
    fn begin_generation(&self) -> u64 {
        self.update(|state| {
            state.connection = ConnectionState::default();
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        })
    }

    fn record_error(&self, message: String) {
        self.update(|state| state.connection.error = Some(message));
    }

    /// Record a precondition failure and hand the error back.
    fn reject(&self, error: ClientError) -> ClientError {
        self.record_error(error.to_string());
        error
    }

    fn transport_failed(&self, generation: u64) {
        let _ = self.update_if_current(generation, |state| {
            state.connection.mark_closed();
            state.connection.error = Some(SOCKET_ERROR_MESSAGE.to_string());
        });
    }

    fn socket_closed(&self, generation: u64) {
        let _ = self.update_if_current(generation, |state| state.connection.mark_closed());
    }

    /// Dispatch one inbound frame read by the socket of `generation`.
    fn handle_frame(&self, generation: u64, frame: &str) {
        let outcome = self.update_if_current(generation, |state| dispatch_frame(state, frame));
        if let (Some(DispatchOutcome::Event(event)), Some(callback)) = (outcome, &self.on_event) {
            callback(&event);
        }
    }
}

impl SocketLink {
    /// Stop the reader task, which sends a Close frame on its way out.
    async fn close(mut self) {
        self.cancel.cancel();
        if tokio::time::timeout(CLOSE_GRACE, &mut self.task)
            .await
            .is_err()
        {
            warn!(generation = self.generation, "reader task did not stop in time, aborting");
            self.task.abort();
            let _ = (&mut self.task).await;
        }
    }
}

/// Sequentially dispatch inbound frames until the socket ends or the
/// caller cancels.
async fn read_loop(
    mut sink: WsSink,
    mut source: WsSource,
    shared: Arc<Shared>,
    generation: u64,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                let _ = sink.close().await;
                debug!(generation, "reader stopped by caller");
                return;
            }
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => shared.handle_frame(generation, text.as_str()),
                Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => shared.handle_frame(generation, text),
                    Err(_) => warn!(len = data.len(), "ignoring non-UTF8 binary frame"),
                },
                Some(Ok(Message::Close(close))) => {
                    info!(?close, "server closed the websocket");
                    shared.socket_closed(generation);
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "websocket error");
                    shared.transport_failed(generation);
                    return;
                }
                None => {
                    info!("websocket stream ended");
                    shared.socket_closed(generation);
                    return;
                }
            }
        }
    }
}
