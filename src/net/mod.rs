//! Network layer
//!
//! HTTP transport for mutations and refetches, plus timeout helpers.
//! Timeout policy lives here, not in the cache.

mod client;
mod timeout;

pub use client::ApiClient;
pub(crate) use client::interpret_response;
pub use timeout::with_timeout;
