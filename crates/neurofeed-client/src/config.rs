//! Client configuration and endpoint URL derivation.

use neurofeed_core::constants::WS_PATH;
use neurofeed_settings::ClientSettings;
use reqwest::Url;

use crate::errors::ClientError;

/// Where a [`NeurofeedbackClient`](crate::NeurofeedbackClient) connects and
/// who it registers as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// HTTP base URL of the feed server (e.g. `http://127.0.0.1:5000`).
    pub base_url: String,
    /// User the client registers as.
    pub user_id: Option<i64>,
}

impl ClientConfig {
    /// Config for `base_url` with no user.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_id: None,
        }
    }

    /// Set the user ID.
    #[must_use]
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Absolute HTTP URL for `path` on the feed server.
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        let base = Url::parse(&self.base_url).map_err(|e| self.invalid(e.to_string()))?;
        match base.scheme() {
            "http" | "https" => {}
            other => return Err(self.invalid(format!("unsupported scheme '{other}'"))),
        }
        base.join(path).map_err(|e| self.invalid(e.to_string()))
    }

    /// Endpoint URL for `path` followed by one percent-encoded `segment`.
    pub fn endpoint_with_segment(&self, path: &str, segment: &str) -> Result<Url, ClientError> {
        let mut url = self.endpoint(path)?;
        let _ = url
            .path_segments_mut()
            .map_err(|()| self.invalid("base URL cannot have path segments".into()))?
            .push(segment);
        Ok(url)
    }

    /// WebSocket URL: same host, `ws`/`wss` scheme, path `/ws`.
    pub fn socket_url(&self) -> Result<Url, ClientError> {
        let mut url = self.endpoint(WS_PATH)?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| self.invalid(format!("cannot switch to '{scheme}' scheme")))?;
        Ok(url)
    }

    fn invalid(&self, reason: String) -> ClientError {
        ClientError::InvalidUrl {
            url: self.base_url.clone(),
            reason,
        }
    }
}

impl From<&ClientSettings> for ClientConfig {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            user_id: settings.user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn socket_url_from_http() {
        let config = ClientConfig::new("http://127.0.0.1:5000");
        assert_eq!(config.socket_url().unwrap().as_str(), "ws://127.0.0.1:5000/ws");
    }

    #[test]
    fn socket_url_from_https() {
        let config = ClientConfig::new("https://feed.example.com");
        assert_eq!(config.socket_url().unwrap().as_str(), "wss://feed.example.com/ws");
    }

    #[test]
    fn socket_url_ignores_base_path() {
        let config = ClientConfig::new("http://localhost:5000/app/");
        assert_eq!(config.socket_url().unwrap().as_str(), "ws://localhost:5000/ws");
    }

    #[test]
    fn endpoint_joins_absolute_path() {
        let config = ClientConfig::new("http://localhost:5000");
        let url = config.endpoint("/api/simulate-neurofeedback").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/simulate-neurofeedback");
    }

    #[test]
    fn segment_is_percent_encoded() {
        let config = ClientConfig::new("http://localhost:5000");
        let url = config
            .endpoint_with_segment("/api/shared-achievements", "a b/c")
            .unwrap();
        assert_eq!(url.path(), "/api/shared-achievements/a%20b%2Fc");
    }

    #[test]
    fn rejects_unparseable_base() {
        let config = ClientConfig::new("not a url");
        assert_matches!(config.socket_url(), Err(ClientError::InvalidUrl { url, .. }) if url == "not a url");
    }

    #[test]
    fn rejects_non_http_scheme() {
        let config = ClientConfig::new("ws://localhost:5000");
        assert_matches!(config.endpoint("/ws"), Err(ClientError::InvalidUrl { reason, .. }) if reason.contains("unsupported scheme"));
    }

    #[test]
    fn from_settings() {
        let settings = ClientSettings {
            base_url: "http://feed:5000".into(),
            user_id: Some(8),
        };
        let config = ClientConfig::from(&settings);
        assert_eq!(config, ClientConfig::new("http://feed:5000").with_user_id(8));
    }
}
