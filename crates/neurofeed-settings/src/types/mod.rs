//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a
//! settings file may set any subset of fields and the rest keep their
//! compiled defaults.

mod client;
mod server;

pub use client::*;
pub use server::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// # JSON Format
///
/// ```json
/// {
///   "client": { "baseUrl": "http://localhost:5000", "userId": 7 },
///   "server": { "port": 5000 },
///   "logging": { "level": "debug" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NeurofeedSettings {
    /// Feed client settings.
    pub client: ClientSettings,
    /// Reference server settings.
    pub server: ServerSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl NeurofeedSettings {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let url = self.client.base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SettingsError::InvalidValue(format!(
                "client.baseUrl must be an http(s) URL, got '{url}'"
            )));
        }
        if let Some(user_id) = self.client.user_id.filter(|id| *id <= 0) {
            return Err(SettingsError::InvalidValue(format!(
                "client.userId must be positive, got {user_id}"
            )));
        }
        if self.server.max_connections == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxConnections must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
