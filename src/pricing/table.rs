//! Built-in price table
//!
//! Approximate list prices per million tokens. Models match by the longest
//! prefix within their provider, so dated snapshots such as
//! `gpt-4o-2024-08-06` resolve to the family price.

use async_trait::async_trait;

use super::{PricingLookup, UsageRequest, UsageResponse};
use crate::constants::pricing::TOKENS_PER_MILLION;
use crate::types::{ReadinessError, Result};

/// Price of one model family in USD per million tokens
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPrice {
    pub provider: String,
    pub model_prefix: String,
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPrice {
    pub fn new(
        provider: impl Into<String>,
        model_prefix: impl Into<String>,
        input_per_million: f64,
        output_per_million: f64,
    ) -> Self {
        Self {
            provider: provider.into(),
            model_prefix: model_prefix.into(),
            input_per_million,
            output_per_million,
        }
    }

    fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> (f64, f64) {
        (
            prompt_tokens as f64 * self.input_per_million / TOKENS_PER_MILLION,
            completion_tokens as f64 * self.output_per_million / TOKENS_PER_MILLION,
        )
    }
}

#[derive(Debug, Clone)]
pub struct StaticPricingTable {
    prices: Vec<ModelPrice>,
}

impl StaticPricingTable {
    pub fn empty() -> Self {
        Self { prices: Vec::new() }
    }

    pub fn builtin() -> Self {
        let p = |provider: &str, prefix: &str, input: f64, output: f64| {
            ModelPrice::new(provider, prefix, input, output)
        };
        Self {
            prices: vec![
                p("openai", "gpt-4.1", 2.0, 8.0),
                p("openai", "gpt-4.1-mini", 0.40, 1.60),
                p("openai", "gpt-4.1-nano", 0.10, 0.40),
                p("openai", "gpt-4o", 2.50, 10.0),
                p("openai", "gpt-4o-mini", 0.15, 0.60),
                p("openai", "gpt-4-turbo", 10.0, 30.0),
                p("openai", "o3", 2.0, 8.0),
                p("openai", "o3-mini", 1.10, 4.40),
                p("openai", "o4-mini", 1.10, 4.40),
                p("anthropic", "claude-opus-4", 15.0, 75.0),
                p("anthropic", "claude-sonnet-4", 3.0, 15.0),
                p("anthropic", "claude-3-5-sonnet", 3.0, 15.0),
                p("anthropic", "claude-3-5-haiku", 0.80, 4.0),
                p("anthropic", "claude-haiku-4", 0.80, 4.0),
                p("google", "gemini-2.5-pro", 1.25, 10.0),
                p("google", "gemini-2.5-flash", 0.30, 2.50),
                p("google", "gemini-2.0-flash", 0.10, 0.40),
            ],
        }
    }

    /// Add or replace the price for a model family
    pub fn with_price(mut self, price: ModelPrice) -> Self {
        self.prices.retain(|existing| {
            existing.provider != price.provider || existing.model_prefix != price.model_prefix
        });
        self.prices.push(price);
        self
    }

    pub fn prices(&self) -> &[ModelPrice] {
        &self.prices
    }

    pub fn find(&self, provider: &str, model: &str) -> Option<&ModelPrice> {
        self.prices
            .iter()
            .filter(|price| {
                price.provider.eq_ignore_ascii_case(provider) && model.starts_with(&price.model_prefix)
            })
            .max_by_key(|price| price.model_prefix.len())
    }
}

impl Default for StaticPricingTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[async_trait]
impl PricingLookup for StaticPricingTable {
    async fn get_usage(&self, request: &UsageRequest) -> Result<UsageResponse> {
        let (provider, model) = request.provider_and_model().ok_or_else(|| {
            ReadinessError::pricing(&request.model_id, "expected a provider:model identifier")
        })?;

        let price = self
            .find(provider, model)
            .ok_or_else(|| ReadinessError::pricing(&request.model_id, "unknown model"))?;

        let (input, output) = price.cost(request.usage.prompt_tokens, request.usage.completion_tokens);
        Ok(UsageResponse::split(input, output))
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::UsageRecord;

    #[test]
    fn test_longest_prefix_wins() {
        let table = StaticPricingTable::builtin();

        assert_eq!(table.find("openai", "gpt-4.1").unwrap().model_prefix, "gpt-4.1");
        assert_eq!(
            table.find("openai", "gpt-4.1-mini-2025-04-14").unwrap().model_prefix,
            "gpt-4.1-mini"
        );
        assert_eq!(
            table.find("openai", "gpt-4o-mini").unwrap().model_prefix,
            "gpt-4o-mini"
        );
        assert!(table.find("anthropic", "gpt-4o").is_none());
    }

    #[tokio::test]
    async fn test_static_cost() {
        let table = StaticPricingTable::builtin();
        let request = UsageRecord::new("openai", "gpt-4.1", 1_000_000, 500_000).to_request();

        let response = table.get_usage(&request).await.unwrap();
        let cost = response.cost_usd.unwrap();
        assert!((cost.input_usd.unwrap() - 2.0).abs() < 1e-9);
        assert!((cost.output_usd.unwrap() - 4.0).abs() < 1e-9);
        assert!((response_total(&table, &request).await - 6.0).abs() < 1e-9);
    }

    async fn response_total(table: &StaticPricingTable, request: &UsageRequest) -> f64 {
        table.get_usage(request).await.unwrap().total_cost().unwrap()
    }

    #[tokio::test]
    async fn test_unknown_model_is_error() {
        let table = StaticPricingTable::builtin();
        let request = UsageRecord::new("acme", "rocket-1", 10, 10).to_request();

        let err = table.get_usage(&request).await.unwrap_err();
        assert!(matches!(err, ReadinessError::Pricing { .. }));
        assert!(err.to_string().contains("acme:rocket-1"));
    }

    #[tokio::test]
    async fn test_with_price_overrides() {
        let table = StaticPricingTable::empty()
            .with_price(ModelPrice::new("openai", "gpt-4.1", 1.0, 1.0))
            .with_price(ModelPrice::new("openai", "gpt-4.1", 10.0, 20.0));
        assert_eq!(table.prices().len(), 1);

        let request = UsageRecord::new("openai", "gpt-4.1", 100_000, 100_000).to_request();
        assert!((response_total(&table, &request).await - 3.0).abs() < 1e-9);
    }
}
