use reqwest::Client;
use scout_core::error::ScoutError;
use scout_core::traits::{Transport, TransportResponse};
use url::Url;

/// HTTP transport using reqwest.
///
/// Posts JSON to paths under a base URL, authenticating with the
/// `X-API-Key` header. No request timeout is set: a call that never
/// completes leaves the caller pending.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(base_url: Url) -> Result<Self, ScoutError> {
        let client = Client::builder()
            .user_agent(concat!("GreenCandleScout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ScoutError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL for `path`, keeping any path prefix of the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, ScoutError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|e| ScoutError::ConfigError(format!("Invalid endpoint for '{path}': {e}")))
    }
}

impl Transport for ReqwestTransport {
    async fn post_json(
        &self,
        path: &str,
        api_key: &str,
        body: &serde_json::Value,
    ) -> Result<TransportResponse, ScoutError> {
        let url = self.endpoint(path)?;

        let response = self
            .client
            .post(url.clone())
            .header("X-API-Key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ScoutError::Unreachable(format!("Connection failed: {e}"))
                } else {
                    ScoutError::Unreachable(e.to_string())
                }
            })?;

        // The status has arrived; a truncated body must not hide it.
        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(%url, status, error = %e, "Failed to read response body");
                String::new()
            }
        };

        tracing::debug!(%url, status, "POST completed");
        Ok(TransportResponse::new(status, text))
    }
}
