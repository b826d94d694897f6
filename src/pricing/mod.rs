//! Token Usage Estimator
//!
//! Converts provider, model and token counts into an estimated USD cost.
//! Prices come from a [`PricingLookup`]: the built-in [`StaticPricingTable`]
//! or a remote [`HttpPricingLookup`]. Estimates never fail; any lookup
//! problem degrades to a zero cost.

mod estimator;
mod http;
mod metrics;
mod table;

pub use estimator::TokenUsageEstimator;
pub use http::HttpPricingLookup;
pub use metrics::{ModelUsage, SharedMetrics, UsageMetrics, UsageSummary, create_shared_metrics};
pub use table::{ModelPrice, StaticPricingTable};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::constants::pricing::MODEL_ID_SEPARATOR;
use crate::types::Result;

// =============================================================================
// Pricing Lookup
// =============================================================================

/// Source of token prices
#[async_trait]
pub trait PricingLookup: Send + Sync {
    async fn get_usage(&self, request: &UsageRequest) -> Result<UsageResponse>;

    fn name(&self) -> &str;
}

/// One LLM call's token usage, consumed immediately by the estimator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub provider: String,
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl UsageRecord {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        prompt_tokens: u64,
        completion_tokens: u64,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            prompt_tokens,
            completion_tokens,
        }
    }

    /// Composite `provider:model` identifier
    pub fn model_id(&self) -> String {
        format!("{}{}{}", self.provider, MODEL_ID_SEPARATOR, self.model)
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }

    pub fn to_request(&self) -> UsageRequest {
        UsageRequest {
            model_id: self.model_id(),
            usage: TokenCounts {
                prompt_tokens: self.prompt_tokens,
                completion_tokens: self.completion_tokens,
                total_tokens: self.total_tokens(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRequest {
    #[serde(rename = "modelId")]
    pub model_id: String,
    pub usage: TokenCounts,
}

impl UsageRequest {
    /// Split the composite id back into provider and model
    pub fn provider_and_model(&self) -> Option<(&str, &str)> {
        self.model_id
            .split_once(MODEL_ID_SEPARATOR)
            .filter(|(provider, model)| !provider.is_empty() && !model.is_empty())
    }
}

/// Token counts as sent to the pricing lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageResponse {
    #[serde(rename = "costUSD", default, skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<CostBreakdown>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    #[serde(rename = "totalUSD", default, skip_serializing_if = "Option::is_none")]
    pub total_usd: Option<f64>,
    #[serde(rename = "inputUSD", default, skip_serializing_if = "Option::is_none")]
    pub input_usd: Option<f64>,
    #[serde(rename = "outputUSD", default, skip_serializing_if = "Option::is_none")]
    pub output_usd: Option<f64>,
}

impl UsageResponse {
    pub fn total(total_usd: f64) -> Self {
        Self {
            cost_usd: Some(CostBreakdown {
                total_usd: Some(total_usd),
                ..CostBreakdown::default()
            }),
        }
    }

    pub fn split(input_usd: f64, output_usd: f64) -> Self {
        Self {
            cost_usd: Some(CostBreakdown {
                total_usd: Some(input_usd + output_usd),
                input_usd: Some(input_usd),
                output_usd: Some(output_usd),
            }),
        }
    }

    /// Total cost, falling back to input + output when no total is given
    pub fn total_cost(&self) -> Option<f64> {
        let cost = self.cost_usd.as_ref()?;
        if let Some(total) = cost.total_usd {
            return Some(total);
        }
        match (cost.input_usd, cost.output_usd) {
            (None, None) => None,
            (input, output) => Some(input.unwrap_or(0.0) + output.unwrap_or(0.0)),
        }
    }
}
