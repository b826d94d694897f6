//! Usage Metrics Collection
//!
//! Accumulates LLM calls, token counts and estimated cost for telemetry and
//! billing display. Thread-safe for concurrent recording.
//!
//! ## Usage
//!
//! ```ignore
//! let metrics = create_shared_metrics("survey-analysis");
//! let estimator = TokenUsageEstimator::new(lookup).with_metrics(metrics.clone());
//! estimator.estimate_cost("openai", "gpt-4.1", 100, 50).await;
//! println!("{}", metrics.summary().display());
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use super::UsageRecord;

/// Cost is accumulated in microdollars so it fits an atomic counter
const MICROS_PER_DOLLAR: f64 = 1_000_000.0;

// =============================================================================
// Usage Metrics
// =============================================================================

/// Thread-safe usage collector.
///
/// Atomics for the totals, RwLock for the per-model breakdown.
pub struct UsageMetrics {
    label: String,
    start_time: Instant,
    calls: AtomicU32,
    /// Calls whose estimate fell back to zero
    unpriced_calls: AtomicU32,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    total_cost_micros: AtomicU64,
    by_model: RwLock<BTreeMap<String, ModelUsage>>,
}

/// Totals for one `provider:model`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelUsage {
    pub calls: u32,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

#[derive(Debug, Clone)]
pub struct UsageSummary {
    pub label: String,
    pub elapsed_ms: u64,
    pub calls: u32,
    pub unpriced_calls: u32,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub models: BTreeMap<String, ModelUsage>,
}

impl UsageMetrics {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start_time: Instant::now(),
            calls: AtomicU32::new(0),
            unpriced_calls: AtomicU32::new(0),
            prompt_tokens: AtomicU64::new(0),
            completion_tokens: AtomicU64::new(0),
            total_cost_micros: AtomicU64::new(0),
            by_model: RwLock::new(BTreeMap::new()),
        }
    }

    /// Record one estimate. A zero cost counts as unpriced.
    pub fn record(&self, record: &UsageRecord, cost_usd: f64) {
        let cost_usd = if cost_usd.is_finite() && cost_usd > 0.0 {
            cost_usd
        } else {
            0.0
        };

        self.calls.fetch_add(1, Ordering::Relaxed);
        if cost_usd == 0.0 {
            self.unpriced_calls.fetch_add(1, Ordering::Relaxed);
        }
        self.prompt_tokens
            .fetch_add(record.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens
            .fetch_add(record.completion_tokens, Ordering::Relaxed);
        self.total_cost_micros
            .fetch_add((cost_usd * MICROS_PER_DOLLAR).round() as u64, Ordering::Relaxed);

        let mut by_model = self.by_model.write().unwrap_or_else(|poisoned| {
            tracing::error!("Usage metrics by_model RwLock poisoned, recovering");
            poisoned.into_inner()
        });
        let usage = by_model.entry(record.model_id()).or_default();
        usage.calls += 1;
        usage.prompt_tokens += record.prompt_tokens;
        usage.completion_tokens += record.completion_tokens;
        usage.cost_usd += cost_usd;
    }

    pub fn summary(&self) -> UsageSummary {
        let prompt_tokens = self.prompt_tokens.load(Ordering::Relaxed);
        let completion_tokens = self.completion_tokens.load(Ordering::Relaxed);

        let models = self
            .by_model
            .read()
            .unwrap_or_else(|poisoned| {
                tracing::error!("Usage metrics by_model RwLock poisoned on read, recovering");
                poisoned.into_inner()
            })
            .clone();

        UsageSummary {
            label: self.label.clone(),
            elapsed_ms: self.start_time.elapsed().as_millis() as u64,
            calls: self.calls.load(Ordering::Relaxed),
            unpriced_calls: self.unpriced_calls.load(Ordering::Relaxed),
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            total_cost_usd: self.total_cost_micros.load(Ordering::Relaxed) as f64
                / MICROS_PER_DOLLAR,
            models,
        }
    }
}

impl std::fmt::Debug for UsageMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageMetrics")
            .field("label", &self.label)
            .field("calls", &self.calls.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl UsageSummary {
    pub fn display(&self) -> String {
        let mut out = format!(
            "Usage: {}\n\
             Calls: {} ({} unpriced)\n\
             Tokens: {} (prompt: {}, completion: {})\n\
             Estimated Cost: ${:.4}",
            self.label,
            self.calls,
            self.unpriced_calls,
            self.total_tokens,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_cost_usd
        );
        for (model_id, usage) in &self.models {
            out.push_str(&format!(
                "\n  {}: {} calls, {} tokens, ${:.4}",
                model_id,
                usage.calls,
                usage.prompt_tokens + usage.completion_tokens,
                usage.cost_usd
            ));
        }
        out
    }
}

// =============================================================================
// Shared Type
// =============================================================================

pub type SharedMetrics = Arc<UsageMetrics>;

pub fn create_shared_metrics(label: impl Into<String>) -> SharedMetrics {
    Arc::new(UsageMetrics::new(label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record() {
        let metrics = UsageMetrics::new("test");
        metrics.record(&UsageRecord::new("openai", "gpt-4.1", 100, 50), 0.0034);
        metrics.record(&UsageRecord::new("acme", "rocket-1", 10, 10), 0.0);

        let summary = metrics.summary();
        assert_eq!(summary.calls, 2);
        assert_eq!(summary.unpriced_calls, 1);
        assert_eq!(summary.total_tokens, 170);
        assert!((summary.total_cost_usd - 0.0034).abs() < 1e-9);
        assert_eq!(summary.models["openai:gpt-4.1"].calls, 1);
        assert_eq!(summary.models["acme:rocket-1"].cost_usd, 0.0);
    }

    #[test]
    fn test_invalid_cost_counts_as_unpriced() {
        let metrics = UsageMetrics::new("test");
        metrics.record(&UsageRecord::new("openai", "gpt-4.1", 1, 1), f64::NAN);
        metrics.record(&UsageRecord::new("openai", "gpt-4.1", 1, 1), -1.0);

        let summary = metrics.summary();
        assert_eq!(summary.unpriced_calls, 2);
        assert_eq!(summary.total_cost_usd, 0.0);
    }

    #[test]
    fn test_concurrent_recording() {
        use std::thread;

        let metrics = create_shared_metrics("concurrent");
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.record(&UsageRecord::new("openai", "gpt-4o", 10, 5), 0.001);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let summary = metrics.summary();
        assert_eq!(summary.calls, 1000);
        assert_eq!(summary.prompt_tokens, 10000);
        assert_eq!(summary.completion_tokens, 5000);
        assert!((summary.total_cost_usd - 1.0).abs() < 0.001);
        assert_eq!(summary.models.len(), 1);
    }

    #[test]
    fn test_summary_display() {
        let metrics = UsageMetrics::new("display-test");
        metrics.record(&UsageRecord::new("openai", "gpt-4.1", 1000, 500), 0.05);

        let display = metrics.summary().display();
        assert!(display.contains("display-test"));
        assert!(display.contains("1500"));
        assert!(display.contains("openai:gpt-4.1"));
        assert!(display.contains("$0.0500"));
    }
}
