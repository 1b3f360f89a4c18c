//! Shared HTTP plumbing for the simulation trigger and achievements client.

use std::sync::OnceLock;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::errors::ClientError;

/// HTTP client used by every request the crate makes.
///
/// Built on first use so constructors stay infallible; a builder failure
/// surfaces as [`ClientError::Http`] from the request that needed it, and
/// the next request tries again.
///
/// No request timeout: a stalled request is only ever reported, never
/// retried or cut short.
#[derive(Clone, Debug, Default)]
pub(crate) struct HttpClient {
    inner: OnceLock<reqwest::Client>,
}

impl HttpClient {
    pub(crate) fn client(&self) -> Result<&reqwest::Client, ClientError> {
        if let Some(client) = self.inner.get() {
            return Ok(client);
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("neurofeed-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .inspect_err(|e| warn!(error = %e, "failed to build HTTP client"))?;
        Ok(self.inner.get_or_init(|| client))
    }
}

/// Decode a JSON body, mapping non-2xx statuses to [`ClientError::Status`].
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let path = response.url().path().to_owned();
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            path,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json::<T>().await?)
}
