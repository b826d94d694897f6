use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{HttpPricingLookup, PricingLookup, SharedMetrics, StaticPricingTable, UsageRecord};
use crate::config::{PricingConfig, PricingSource};
use crate::types::{ReadinessError, Result};

/// Estimates the USD cost of an LLM call.
///
/// A wrong cost of zero is preferred over breaking the caller: every lookup
/// failure is logged and reported as `0.0`.
#[derive(Clone)]
pub struct TokenUsageEstimator {
    lookup: Arc<dyn PricingLookup>,
    metrics: Option<SharedMetrics>,
}

impl TokenUsageEstimator {
    pub fn new(lookup: Arc<dyn PricingLookup>) -> Self {
        Self {
            lookup,
            metrics: None,
        }
    }

    pub fn from_config(config: &PricingConfig) -> Result<Self> {
        let lookup: Arc<dyn PricingLookup> = match config.source {
            PricingSource::Static => Arc::new(StaticPricingTable::builtin()),
            PricingSource::Http => Arc::new(HttpPricingLookup::from_config(config)?),
        };
        Ok(Self::new(lookup))
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn lookup_name(&self) -> &str {
        self.lookup.name()
    }

    pub async fn estimate_cost(
        &self,
        provider: &str,
        model: &str,
        prompt_tokens: u64,
        completion_tokens: u64,
    ) -> f64 {
        self.estimate(&UsageRecord::new(provider, model, prompt_tokens, completion_tokens))
            .await
    }

    pub async fn estimate(&self, record: &UsageRecord) -> f64 {
        // A panicking lookup is absorbed like any other failure
        let outcome = AssertUnwindSafe(self.try_estimate(record))
            .catch_unwind()
            .await;
        let cost = match outcome {
            Ok(Ok(cost)) => {
                debug!("Estimated {} at ${:.6}", record.model_id(), cost);
                cost
            }
            Ok(Err(e)) => {
                warn!("Cost estimate for {} unavailable, reporting 0: {}", record.model_id(), e);
                0.0
            }
            Err(_) => {
                warn!(
                    "Pricing lookup '{}' panicked for {}, reporting 0",
                    self.lookup.name(),
                    record.model_id()
                );
                0.0
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record(record, cost);
        }
        cost
    }

    /// The fallible lookup behind [`estimate`](Self::estimate)
    pub async fn try_estimate(&self, record: &UsageRecord) -> Result<f64> {
        let model_id = record.model_id();
        let response = self.lookup.get_usage(&record.to_request()).await?;

        let cost = response
            .total_cost()
            .ok_or_else(|| ReadinessError::pricing(&model_id, "response carried no cost"))?;

        if !cost.is_finite() || cost < 0.0 {
            return Err(ReadinessError::pricing(
                &model_id,
                format!("invalid cost {}", cost),
            ));
        }
        Ok(cost)
    }
}

impl std::fmt::Debug for TokenUsageEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenUsageEstimator")
            .field("lookup", &self.lookup.name())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
