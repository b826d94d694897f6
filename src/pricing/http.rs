//! Remote pricing endpoint
//!
//! POSTs the usage request as JSON and decodes the cost breakdown.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{PricingLookup, UsageRequest, UsageResponse};
use crate::config::PricingConfig;
use crate::net::{interpret_response, with_timeout};
use crate::types::{NetworkError, ReadinessError, Result};

/// Pricing lookup with secure API key handling
pub struct HttpPricingLookup {
    endpoint: Url,
    /// Never exposed in logs or debug output
    api_key: Option<SecretString>,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpPricingLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPricingLookup")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpPricingLookup {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            ReadinessError::Config(format!("Invalid pricing endpoint '{}': {}", endpoint, e))
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReadinessError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            api_key: api_key.map(SecretString::from),
            timeout,
            client,
        })
    }

    pub fn from_config(config: &PricingConfig) -> Result<Self> {
        let endpoint = config.endpoint.as_deref().ok_or_else(|| {
            ReadinessError::Config("pricing.endpoint is required for the http source".to_string())
        })?;
        Self::new(
            endpoint,
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl PricingLookup for HttpPricingLookup {
    async fn get_usage(&self, request: &UsageRequest) -> Result<UsageResponse> {
        debug!("Requesting price for {} from {}", request.model_id, self.endpoint);

        let mut builder = self.client.post(self.endpoint.clone()).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let body = with_timeout(
            self.timeout,
            async {
                let response = builder.send().await.map_err(NetworkError::from)?;
                let status = response.status().as_u16();
                let bytes = response.bytes().await.map_err(NetworkError::from)?;
                interpret_response(status, &bytes)
            },
            "pricing lookup",
        )
        .await?;

        serde_json::from_value(body).map_err(|e| {
            ReadinessError::pricing(&request.model_id, format!("malformed response: {}", e))
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}
