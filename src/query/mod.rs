//! Query construction and execution guards.
//!
//! Everything between a validated request and the database lives here:
//! the fragment allow-list, the shared best-account SQL generators, period
//! window math, and the timeout guard every assembler call runs under.

pub mod filters;
pub mod sql;
pub mod window;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{error, warn};

use crate::config::QueryConfig;
use filters::FilterError;

/// Errors surfaced by the aggregation engine.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// The operation missed its deadline. The message is the one surface
    /// intended for end users.
    #[error("query '{operation}' timed out after {timeout_ms} ms; try a shorter date range or fewer filters")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Races database operations against a deadline.
///
/// Single-shape queries get the short bound, batch history queries the long
/// one. The timer only stops the caller from waiting; it does not cancel the
/// statement server-side; the pool's `statement_timeout` is the backstop
/// for that.
#[derive(Debug, Clone, Copy)]
pub struct QueryGuard {
    single_timeout: Duration,
    batch_timeout: Duration,
    slow_ratio: f64,
}

impl QueryGuard {
    pub fn new(config: &QueryConfig) -> Self {
        Self {
            single_timeout: config.single_timeout(),
            batch_timeout: config.batch_timeout(),
            slow_ratio: config.slow_query_ratio,
        }
    }

    /// Run a single-shape dashboard query under the short deadline.
    pub async fn run_single<T, F>(&self, operation: &str, fut: F) -> Result<T, QueryError>
    where
        F: Future<Output = Result<T, QueryError>>,
    {
        self.run(operation, self.single_timeout, fut).await
    }

    /// Run a multi-entity batch query under the long deadline.
    pub async fn run_batch<T, F>(&self, operation: &str, fut: F) -> Result<T, QueryError>
    where
        F: Future<Output = Result<T, QueryError>>,
    {
        self.run(operation, self.batch_timeout, fut).await
    }

    async fn run<T, F>(&self, operation: &str, timeout: Duration, fut: F) -> Result<T, QueryError>
    where
        F: Future<Output = Result<T, QueryError>>,
    {
        let started = Instant::now();
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(value)) => {
                let elapsed = started.elapsed();
                if elapsed >= timeout.mul_f64(self.slow_ratio) {
                    warn!(
                        operation,
                        elapsed_ms = elapsed.as_millis() as u64,
                        timeout_ms = timeout.as_millis() as u64,
                        "slow query"
                    );
                }
                Ok(value)
            }
            // Errors from the operation itself propagate unchanged.
            Ok(Err(e)) => Err(e),
            Err(_) => {
                let timeout_ms = timeout.as_millis() as u64;
                error!(operation, timeout_ms, "query timed out");
                Err(QueryError::Timeout {
                    operation: operation.to_string(),
                    timeout_ms,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard(single_ms: u64, batch_ms: u64) -> QueryGuard {
        QueryGuard::new(&QueryConfig {
            single_timeout_ms: single_ms,
            batch_timeout_ms: batch_ms,
            slow_query_ratio: 0.8,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_operation_returns_result() {
        let guard = guard(200, 400);
        let result = guard
            .run_single("leaderboard:teams", async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<_, QueryError>(7)
            })
            .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_operation_times_out() {
        let guard = guard(200, 400);
        let result = guard
            .run_single("leaderboard:teams", std::future::pending::<Result<i32, QueryError>>())
            .await;
        match result {
            Err(QueryError::Timeout {
                operation,
                timeout_ms,
            }) => {
                assert_eq!(operation, "leaderboard:teams");
                assert_eq!(timeout_ms, 200);
            }
            other => panic!("expected timeout, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_bound_is_longer() {
        let guard = guard(200, 400);
        // An operation too slow for the single bound still fits the batch bound.
        let result = guard
            .run_batch("history:teams", async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok::<_, QueryError>("series")
            })
            .await;
        assert_eq!(result.unwrap(), "series");
    }

    #[tokio::test(start_paused = true)]
    async fn test_inner_error_propagates_unchanged() {
        let guard = guard(200, 400);
        let result: Result<i32, QueryError> = guard
            .run_single("movers:gainers", async {
                Err(QueryError::Filter(FilterError::EmptyValueList))
            })
            .await;
        assert!(matches!(
            result,
            Err(QueryError::Filter(FilterError::EmptyValueList))
        ));
    }

    #[test]
    fn test_timeout_message_is_user_actionable() {
        let err = QueryError::Timeout {
            operation: "leaderboard:players".to_string(),
            timeout_ms: 10_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("leaderboard:players"));
        assert!(msg.contains("shorter date range"));
    }
}
