//! `NeurofeedServer`: axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use neurofeed_core::constants::{SIMULATE_PATH, WS_PATH};
use neurofeed_core::{NeurofeedbackEvent, ServerMessage, SimulateRequest};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::simulate::{self, EventFactory};
use crate::websocket::broadcast::BroadcastManager;
use crate::websocket::session::run_ws_session;

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live connections and per-user fan-out.
    pub broadcast: Arc<BroadcastManager>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Simulated event source.
    pub events: Arc<EventFactory>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
}

/// The reference feed server.
pub struct NeurofeedServer {
    state: AppState,
}

impl NeurofeedServer {
    /// Create a server. Nothing is bound until [`listen`](Self::listen).
    pub fn new(config: ServerConfig) -> Self {
        Self {
            state: AppState {
                broadcast: Arc::new(BroadcastManager::new()),
                shutdown: Arc::new(ShutdownCoordinator::new()),
                events: Arc::new(EventFactory::new()),
                config: Arc::new(config),
                start_time: Instant::now(),
            },
        }
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route(WS_PATH, get(ws_handler))
            .route(SIMULATE_PATH, post(simulate_handler))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind and serve in a background task.
    ///
    /// Returns the bound address. The task ends once
    /// [`shutdown`](Self::shutdown) is triggered and in-flight requests drain.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let listener = tokio::net::TcpListener::bind(self.state.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "neurofeed server listening");

        let router = self.router();
        let token = self.state.shutdown.token();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                warn!(error = %e, "server exited with error");
            }
        });
        Ok((addr, handle))
    }

    /// Get the broadcast manager.
    pub fn broadcast(&self) -> &Arc<BroadcastManager> {
        &self.state.broadcast
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.broadcast.connection_count().await;
    let registered = state.broadcast.registered_count().await;
    Json(health::health_check(state.start_time, connections, registered))
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let limit = state.config.max_connections;
    if state.broadcast.connection_count().await >= limit {
        warn!(limit, "rejecting websocket upgrade");
        return ServerError::TooManyConnections(limit).into_response();
    }

    let connection_id = format!("conn_{}", Uuid::now_v7());
    let token = state.shutdown.token();
    let send_queue = state.config.send_queue;
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| {
            run_ws_session(socket, connection_id, state.broadcast, send_queue, token)
        })
}

/// POST /api/simulate-neurofeedback
#[instrument(skip_all)]
async fn simulate_handler(
    State(state): State<AppState>,
    payload: Result<Json<SimulateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<NeurofeedbackEvent>), ServerError> {
    let Json(request) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    simulate::validate(&request)?;

    let event = state.events.create(&request);
    let delivered = state
        .broadcast
        .send_to_user(
            request.user_id,
            &ServerMessage::Neurofeedback {
                data: event.clone(),
            },
        )
        .await;
    info!(
        event_id = event.id,
        user_id = request.user_id,
        delivered,
        "simulated event created"
    );
    Ok((StatusCode::CREATED, Json(event)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn make_server() -> NeurofeedServer {
        NeurofeedServer::new(ServerConfig::default())
    }

    async fn body_json(resp: Response) -> Value {
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn simulate_request(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(SIMULATE_PATH)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_counters() {
        let app = make_server().router();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let parsed = body_json(resp).await;
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 0);
        assert_eq!(parsed["registeredConnections"], 0);
    }

    #[tokio::test]
    async fn simulate_returns_created_event() {
        let app = make_server().router();
        let resp = app
            .oneshot(simulate_request(&json!({
                "userId": 3,
                "brainRegionId": "amygdala",
                "intensity": 60.0
            })))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        let event = body_json(resp).await;
        assert_eq!(event["id"], 1);
        assert_eq!(event["userId"], 3);
        assert_eq!(event["brainRegionId"], "amygdala");
        assert_eq!(event["intensity"], 60.0);
        assert_eq!(event["metadata"]["source"], "simulation");
        assert!(event["timestamp"].is_string());
    }

    #[tokio::test]
    async fn simulate_rejects_invalid_body() {
        let app = make_server().router();
        let resp = app
            .oneshot(simulate_request(&json!({"userId": 3, "brainRegionId": ""})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["message"], "brainRegionId is required");
    }

    #[tokio::test]
    async fn simulate_rejects_malformed_json() {
        let app = make_server().router();
        let req = Request::builder()
            .method("POST")
            .uri(SIMULATE_PATH)
            .header("content-type", "application/json")
            .body(Body::from("{"))
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await["message"].is_string());
    }

    #[tokio::test]
    async fn ws_route_requires_upgrade() {
        let app = make_server().router();
        let req = Request::builder().uri(WS_PATH).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = make_server().router();
        let req = Request::builder()
            .uri("/nonexistent")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_binds_ephemeral_port_and_stops() {
        let server = make_server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);

        server.shutdown().shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
