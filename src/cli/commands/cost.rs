//! Cost Command
//!
//! Estimate the USD cost of an LLM call with the configured pricing source.
//!
//! Usage:
//!   readiness cost openai gpt-4.1 --prompt-tokens 100 --completion-tokens 50

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::pricing::{UsageRecord, create_shared_metrics};
use crate::types::Result;

pub async fn run(
    ctx: &CommandContext,
    record: UsageRecord,
    format: &str,
) -> Result<()> {
    let metrics = create_shared_metrics("cli");
    let estimator = ctx.estimator()?.with_metrics(metrics.clone());
    let cost = estimator.estimate(&record).await;

    if format == "json" {
        let report = serde_json::json!({
            "modelId": record.model_id(),
            "usage": record.to_request().usage,
            "pricing": estimator.lookup_name(),
            "costUSD": cost,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let output = Output::new();
    output.header(&record.model_id());
    output.field("prompt", record.prompt_tokens);
    output.field("completion", record.completion_tokens);
    output.field("pricing", estimator.lookup_name());
    output.field("cost", format!("${:.6}", cost));

    if metrics.summary().unpriced_calls > 0 {
        output.warning("No price available; reported as $0. Run with --verbose for details.");
    }
    Ok(())
}
