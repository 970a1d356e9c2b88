//! Retry with exponential backoff and jitter

use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// How often and how patiently to retry a failing operation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first one included
    pub max_attempts: usize,

    /// Delay before the first retry, in seconds
    pub initial_interval: f64,

    pub backoff_factor: f64,

    /// Upper bound for any single delay, in seconds
    pub max_interval: f64,

    /// Scale each delay by a random factor in `[0.5, 1.5]`
    pub jitter: bool,
}

impl RetryPolicy {
    /// ```rust
    /// use tooling::async_utils::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(3);
    /// assert_eq!(policy.max_attempts, 3);
    /// ```
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_interval: 0.5,
            backoff_factor: 2.0,
            max_interval: 30.0,
            jitter: true,
        }
    }

    /// Single attempt, never retries
    pub fn none() -> Self {
        Self::new(1)
    }

    pub fn with_initial_interval(mut self, seconds: f64) -> Self {
        self.initial_interval = seconds;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_max_interval(mut self, seconds: f64) -> Self {
        self.max_interval = seconds;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay after the failed attempt `attempt` (0-indexed)
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        let base = self.initial_interval * self.backoff_factor.powi(attempt as i32);
        let capped = base.min(self.max_interval).max(0.0);
        let delay = if self.jitter {
            capped * rand::thread_rng().gen_range(0.5..=1.5)
        } else {
            capped
        };
        Duration::from_secs_f64(delay)
    }

    /// Whether attempt number `attempt` (0-indexed) may still run
    pub fn should_retry(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Retry every error until the policy is exhausted
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry_if(policy, |_| true, operation).await
}

/// Retry errors accepted by `retryable`; any other error is returned at once
pub async fn with_retry_if<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    retryable: P,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                attempt += 1;
                if !retryable(&error) || !policy.should_retry(attempt) {
                    return Err(error);
                }
                let delay = policy.calculate_delay(attempt - 1);
                tracing::debug!(attempt, ?delay, %error, "retrying after failure");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
