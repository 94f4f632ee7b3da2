use crate::domain::ports::Sleeper;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::header::HeaderValue;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Result of a single request attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    /// HTTP 429. `retry_after` is `None` when the header was missing or unparsable.
    RateLimited { retry_after: Option<Duration> },
    Done(T),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Resolved { value: T, attempts: u32 },
    Exhausted { attempts: u32 },
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Resolved { attempts, .. } | RetryOutcome::Exhausted { attempts } => {
                *attempts
            }
        }
    }

    pub fn value(self) -> Option<T> {
        match self {
            RetryOutcome::Resolved { value, .. } => Some(value),
            RetryOutcome::Exhausted { .. } => None,
        }
    }
}

/// Reads `Retry-After` as whole seconds.
pub fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    header
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Server-paced retry on HTTP 429. The wait is whatever the controller
/// advertises, or `default_wait`; there is no exponential growth.
#[derive(Clone)]
pub struct RateLimitRetry {
    max_retries: u32,
    default_wait: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl RateLimitRetry {
    pub fn new(max_retries: u32, default_wait: Duration, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            max_retries,
            default_wait,
            sleeper,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Calls `attempt` until it returns [`Attempt::Done`] or `max_retries`
    /// rate-limited responses have been seen. Errors from `attempt` are
    /// returned unchanged.
    pub async fn run<T, F, Fut>(&self, label: &str, mut attempt: F) -> Result<RetryOutcome<T>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Attempt<T>>>,
    {
        let mut retries = 0;

        while retries < self.max_retries {
            match attempt(retries + 1).await? {
                Attempt::Done(value) => {
                    return Ok(RetryOutcome::Resolved {
                        value,
                        attempts: retries + 1,
                    });
                }
                Attempt::RateLimited { retry_after } => {
                    let wait = retry_after.unwrap_or(self.default_wait);
                    tracing::warn!(
                        "⏳ Rate limit hit (HTTP 429) on {}. Waiting {} seconds before retrying...",
                        label,
                        wait.as_secs()
                    );
                    self.sleeper.sleep(wait).await;
                    retries += 1;
                }
            }
        }

        tracing::warn!("Max retries exceeded for {}", label);
        Ok(RetryOutcome::Exhausted { attempts: retries })
    }
}

impl Default for RateLimitRetry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_AFTER, Arc::new(TokioSleeper))
    }
}
