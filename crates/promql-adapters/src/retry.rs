use std::time::Duration;
use tracing::{debug, warn};

use crate::{AdapterError, AdapterResult};

/// Bounded retry with a fixed delay between attempts.
///
/// Only startup connectivity checks retry; request-path calls never do.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
    /// Upper bound on a single attempt.
    pub attempt_timeout: Option<Duration>,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            attempt_timeout: None,
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    async fn attempt<Fut, T>(&self, fut: Fut) -> AdapterResult<T>
    where
        Fut: std::future::Future<Output = AdapterResult<T>>,
    {
        match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
                Err(AdapterError::Timeout(format!("no response within {:?}", limit)))
            }),
            None => fut.await,
        }
    }

    pub async fn execute<F, Fut, T>(&self, mut f: F) -> AdapterResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = AdapterResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                debug!(
                    "Retry attempt {}/{}, waiting {:?}",
                    attempt + 1,
                    self.max_attempts,
                    self.delay
                );
                tokio::time::sleep(self.delay).await;
            }

            match self.attempt(f()).await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("Operation succeeded on retry attempt {}", attempt + 1);
                    }
                    return Ok(result);
                }
                Err(e) => {
                    warn!(
                        "Operation failed on attempt {}/{}: {}",
                        attempt + 1,
                        self.max_attempts,
                        e
                    );

                    if !is_retryable(&e) {
                        return Err(e);
                    }

                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AdapterError::Unknown("no attempts were made".to_string())
        }))
    }
}

fn is_retryable(error: &AdapterError) -> bool {
    match error {
        AdapterError::ConnectionError(_)
        | AdapterError::RequestFailed(_)
        | AdapterError::Timeout(_)
        | AdapterError::Unknown(_) => true,
        AdapterError::SerializationError(_)
        | AdapterError::InvalidResponse(_)
        | AdapterError::Configuration(_)
        | AdapterError::Cancelled => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retry_success_on_first_attempt() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));
        let attempts = Arc::new(AtomicUsize::new(0));

        let result = policy.execute(|| {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Ok::<_, AdapterError>(42)
            }
        }).await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fixed_policy_exhausts_attempts() {
        let policy = RetryPolicy::fixed(5, Duration::from_millis(1));
        let attempts = Arc::new(AtomicUsize::new(0));

        let result = policy.execute(|| {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(AdapterError::ConnectionError("refused".to_string()))
            }
        }).await;

        assert!(matches!(result, Err(AdapterError::ConnectionError(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_retry_success_on_second_attempt() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));
        let attempts = Arc::new(AtomicUsize::new(0));

        let result = policy.execute(|| {
            let attempts = attempts.clone();
            async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                if attempt == 0 {
                    Err(AdapterError::RequestFailed("First attempt failed".to_string()))
                } else {
                    Ok(42)
                }
            }
        }).await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));
        let attempts = Arc::new(AtomicUsize::new(0));

        let result = policy.execute(|| {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(AdapterError::Cancelled)
            }
        }).await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_attempts_are_cut_off() {
        let policy = RetryPolicy::fixed(2, Duration::from_secs(2))
            .with_attempt_timeout(Duration::from_secs(5));
        let attempts = Arc::new(AtomicUsize::new(0));
        let started = tokio::time::Instant::now();

        let result = policy.execute(|| {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                std::future::pending::<AdapterResult<()>>().await
            }
        }).await;

        assert!(matches!(result, Err(AdapterError::Timeout(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(12) && elapsed < Duration::from_secs(13));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_is_constant() {
        let policy = RetryPolicy::fixed(4, Duration::from_secs(2));
        let started = tokio::time::Instant::now();

        let result = policy
            .execute(|| async { Err::<(), _>(AdapterError::RequestFailed("503".to_string())) })
            .await;

        assert!(result.is_err());
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_secs(7));
    }
}
