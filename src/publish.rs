//! Publish sink: one JSON POST per summary endpoint. Failures are logged
//! and never abort the cycle.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

pub struct Publisher {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl Publisher {
    pub fn new(base_url: &str, api_key: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Publisher {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// POST one summary. Non-2xx responses and transport errors are logged
    /// with the endpoint; the caller proceeds either way.
    pub async fn send<T: Serialize>(&self, endpoint: &str, payload: &T) {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut request = self.client.post(&url).json(payload);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key).header("apikey", &self.api_key);
        }
        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!("published {endpoint}");
            }
            Ok(response) => {
                warn!("publish to {endpoint} rejected: {}", response.status());
            }
            Err(e) => {
                warn!("publish to {endpoint} failed: {e}");
            }
        }
    }
}
