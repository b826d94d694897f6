//! Timeout helpers for network operations
//!
//! ## Usage
//!
//! ```ignore
//! let value = with_timeout(Duration::from_secs(30), client.get_json("surveys"), "GET surveys").await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::types::{ReadinessError, Result};

/// Execute an async operation with a timeout
///
/// Returns a timeout error if the operation doesn't complete within the specified duration.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(ReadinessError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(Duration::from_secs(1), async { Ok(42) }, "test").await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result: Result<()> = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            },
            "slow operation",
        )
        .await;

        match result.unwrap_err() {
            ReadinessError::Timeout { operation, .. } => assert_eq!(operation, "slow operation"),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
