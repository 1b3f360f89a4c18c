//! REST client for the achievements backend.

use neurofeed_core::constants::{ACHIEVEMENTS_PATH, SHARED_ACHIEVEMENTS_PATH};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::http::{HttpClient, read_json};

/// An achievement record. Only the id is interpreted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    /// Achievement id.
    pub id: i64,
    /// Every other field, untouched.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Achievement {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Achievements endpoints on the feed server.
#[derive(Clone, Debug)]
pub struct AchievementsApi {
    http: HttpClient,
    config: ClientConfig,
}

impl AchievementsApi {
    /// Client for the server at `config.base_url`.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: HttpClient::default(),
            config,
        }
    }

    /// `GET /api/achievements/:id`
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Achievement, ClientError> {
        let url = self
            .config
            .endpoint_with_segment(ACHIEVEMENTS_PATH, &id.to_string())?;
        debug!(%url, "fetching achievement");
        read_json(self.http.client()?.get(url).send().await?).await
    }

    /// `PATCH /api/achievements/:id` with a partial JSON body.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: i64, patch: &Value) -> Result<Achievement, ClientError> {
        let url = self
            .config
            .endpoint_with_segment(ACHIEVEMENTS_PATH, &id.to_string())?;
        debug!(%url, "updating achievement");
        read_json(self.http.client()?.patch(url).json(patch).send().await?).await
    }

    /// `GET /api/shared-achievements/:hash`
    #[instrument(skip(self))]
    pub async fn shared(&self, hash: &str) -> Result<Achievement, ClientError> {
        let url = self
            .config
            .endpoint_with_segment(SHARED_ACHIEVEMENTS_PATH, hash)?;
        read_json(self.http.client()?.get(url).send().await?).await
    }
}
