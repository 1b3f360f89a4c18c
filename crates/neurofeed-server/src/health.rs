//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Open WebSocket connections.
    pub connections: usize,
    /// Connections bound to a user.
    pub registered_connections: usize,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, connections: usize, registered: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        registered_connections: registered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_ok() {
        let resp = health_check(Instant::now(), 0, 0);
        assert_eq!(resp.status, "ok");
        assert!(resp.uptime_secs < 2);
    }

    #[test]
    fn uptime_increases() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(60))
            .unwrap();
        assert!(health_check(start, 0, 0).uptime_secs >= 59);
    }

    #[test]
    fn serializes_camel_case() {
        let resp = health_check(Instant::now(), 3, 2);
        let parsed = serde_json::to_value(&resp).unwrap();
        assert_eq!(parsed["connections"], 3);
        assert_eq!(parsed["registeredConnections"], 2);
        assert!(parsed["uptimeSecs"].is_number());
    }
}
