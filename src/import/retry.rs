use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::ImportConfig;

/// How a single remote fetch failed, which decides whether it is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// Definitive: the unit does not exist upstream.
    #[error("not found")]
    NotFound,

    /// Timeouts, connection errors, 5xx, 408 and 429.
    #[error("temporary failure: {0}")]
    Retryable(String),

    #[error("{0}")]
    Fatal(String),
}

/// `None` for success statuses.
pub fn classify_status(status: StatusCode) -> Option<FetchFailure> {
    if status.is_success() {
        None
    } else if status == StatusCode::NOT_FOUND {
        Some(FetchFailure::NotFound)
    } else if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        Some(FetchFailure::Retryable(format!("HTTP {status}")))
    } else {
        Some(FetchFailure::Fatal(format!("HTTP {status}")))
    }
}

pub fn classify_error(err: &reqwest::Error) -> FetchFailure {
    if let Some(failure) = err.status().and_then(classify_status) {
        return failure;
    }
    if err.is_timeout() || err.is_connect() {
        FetchFailure::Retryable(err.to_string())
    } else {
        FetchFailure::Fatal(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ImportConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Pause after failed attempt number `attempt` (1-based): doubles each time, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails definitively, or attempts run out.
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, FetchFailure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchFailure>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Err(FetchFailure::Retryable(reason)) if attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        "Attempt {}/{} failed ({}), retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        reason,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn delays_double_and_cap() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
        assert_eq!(policy.delay_for(40), Duration::from_millis(350));
    }

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(StatusCode::OK), None);
        assert_eq!(classify_status(StatusCode::NOT_FOUND), Some(FetchFailure::NotFound));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY),
            Some(FetchFailure::Retryable(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            Some(FetchFailure::Retryable(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED),
            Some(FetchFailure::Fatal(_))
        ));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = Cell::new(0);
        let result = instant_policy(3)
            .run(|attempt| {
                calls.set(calls.get() + 1);
                async move {
                    if attempt < 3 {
                        Err(FetchFailure::Retryable("HTTP 503".to_string()))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), _> = instant_policy(2)
            .run(|_| {
                calls.set(calls.get() + 1);
                async { Err(FetchFailure::Retryable("timeout".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(FetchFailure::Retryable(_))));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn not_found_is_never_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = instant_policy(5)
            .run(|_| {
                calls.set(calls.get() + 1);
                async { Err(FetchFailure::NotFound) }
            })
            .await;

        assert_eq!(result, Err(FetchFailure::NotFound));
        assert_eq!(calls.get(), 1);
    }
}
