//! 有界指数退避重试
//!
//! 仅对「可重试」错误（限流 / 容量暂时不足）重试，最多 `max_attempts` 次，间隔 2s、4s……翻倍；
//! 等待使用 tokio::time::sleep，不占线程。不可重试错误或最后一次失败原样返回给调用方。

use std::future::Future;
use std::time::Duration;

use crate::config::RetrySection;
use crate::llm::LlmError;

/// 错误是否值得再试一次
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for LlmError {
    fn is_retryable(&self) -> bool {
        self.retryable
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(2000),
        }
    }
}

impl From<&RetrySection> for RetryPolicy {
    fn from(section: &RetrySection) -> Self {
        Self::new(section.max_attempts, section.initial_delay())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    /// 不重试（测试或对延迟敏感的调用）
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// 重试全部失败时累计的等待时长：initial × (2^(attempts-1) − 1)
    pub fn total_backoff(&self) -> Duration {
        let doublings = self.max_attempts.saturating_sub(1).min(31);
        self.initial_delay
            .saturating_mul((1u32 << doublings).saturating_sub(1))
    }

    /// 执行 `operation`，按策略重试可重试错误
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut delay = self.initial_delay;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    tracing::warn!(
                        "{label}: rate limited ({err}), retrying in {}ms (attempt {attempt}/{max_attempts})",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    delay = delay.saturating_mul(2);
                }
                Err(err) => {
                    tracing::warn!("{label}: failed after {attempt} attempt(s): {err}");
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_exhausts_attempts_with_backoff() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), LlmError> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(LlmError::rate_limited("429")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 2000 + 4000
        assert_eq!(start.elapsed(), Duration::from_millis(6000));
        assert_eq!(policy.total_backoff(), Duration::from_millis(6000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_propagates_immediately() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), LlmError> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(LlmError::malformed("not json")) }
            })
            .await;

        assert_eq!(result.unwrap_err(), LlmError::malformed("not json"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failure() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = policy
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(LlmError::rate_limited("busy"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(start.elapsed(), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_never_sleeps() {
        let policy = RetryPolicy::new(1, Duration::from_secs(10));
        let calls = AtomicU32::new(0);

        let result: Result<(), LlmError> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(LlmError::rate_limited("429")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(policy.total_backoff(), Duration::ZERO);
    }
}
