//! Feed client settings.

use serde::{Deserialize, Serialize};

/// Where the client connects and who it connects as.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// HTTP base URL of the feed server. The WebSocket URL is derived from it.
    pub base_url: String,
    /// User the client registers as. Connecting without one fails fast.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            user_id: None,
        }
    }
}
