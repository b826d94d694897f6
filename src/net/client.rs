//! Dashboard API client
//!
//! JSON over HTTP. Any non-2xx status is a failure classified by
//! [`NetworkError::from_status`]; an empty 2xx body decodes as `null`.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::timeout::with_timeout;
use crate::cache::{CacheKey, QueryFetcher};
use crate::config::ApiConfig;
use crate::constants::network as net_constants;
use crate::types::{ErrorCategory, NetworkError, ReadinessError, Result};

#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    timeout: Duration,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        // Url::join drops the last segment unless the base ends with '/'
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).map_err(|e| {
            ReadinessError::Config(format!("Invalid api.base_url '{}': {}", config.base_url, e))
        })?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(net_constants::CONNECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| ReadinessError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base,
            timeout,
            client,
        })
    }

    /// Absolute URL for a path relative to the API base
    pub fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ReadinessError::Config(format!("Invalid API path '{}': {}", path, e)))
    }

    pub async fn get_json(&self, path: &str) -> Result<Value> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn patch_json(&self, path: &str, body: &Value) -> Result<Value> {
        self.send(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.send(Method::DELETE, path, None).await
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.url(path)?;
        let operation = format!("{} {}", method, url.path());
        debug!("Sending {}", operation);

        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        with_timeout(
            self.timeout,
            async {
                let response = request.send().await.map_err(NetworkError::from)?;
                let status = response.status().as_u16();
                let bytes = response.bytes().await.map_err(NetworkError::from)?;
                interpret_response(status, &bytes)
            },
            &operation,
        )
        .await
    }
}

/// Map a status and body to the JSON payload or a classified failure
pub(crate) fn interpret_response(status: u16, body: &[u8]) -> Result<Value> {
    if !(200..300).contains(&status) {
        let message = String::from_utf8_lossy(body).trim().to_string();
        return Err(NetworkError::from_status(status, message).into());
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| {
        NetworkError::new(ErrorCategory::Decode, format!("Invalid JSON response: {}", e)).into()
    })
}

#[async_trait]
impl QueryFetcher for ApiClient {
    async fn fetch(&self, key: &CacheKey) -> Result<Value> {
        self.get_json(&key.path()).await
    }
}
