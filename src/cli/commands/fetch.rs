//! Fetch Command
//!
//! Read one cache key through the configured API.
//!
//! Usage:
//!   readiness fetch surveys
//!   readiness fetch users u-1
//!   readiness fetch users --team t-1

use crate::cache::{CacheKey, QueryCache};
use crate::cli::util::CommandContext;
use crate::net::ApiClient;
use crate::types::Result;

pub async fn run(ctx: &CommandContext, key: CacheKey) -> Result<()> {
    let client = ApiClient::new(&ctx.config.api)?;
    let cache = QueryCache::shared(&ctx.config.cache);

    let value = cache.fetch(&key, &client).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
