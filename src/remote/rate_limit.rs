// src/remote/rate_limit.rs

use crate::error::{AppError, AppResult};
use log::{debug, warn};
use std::{
    fmt,
    future::Future,
    time::{Duration, Instant},
};
use tokio::sync::Mutex as TokioMutex;

/// 远程调用失败的分类，决定重试策略
#[derive(Debug)]
pub enum RemoteError {
    /// 被限流或服务繁忙，退避时间翻倍
    RateLimited(String),
    /// 网络错误或超时，退避时间乘以 2.5
    Network(String),
    /// 不可重试，直接向上传递
    Fatal(AppError),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::RateLimited(msg) => write!(f, "服务繁忙或被限流: {}", msg),
            RemoteError::Network(msg) => write!(f, "网络错误: {}", msg),
            RemoteError::Fatal(e) => write!(f, "{}", e),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            RemoteError::Network(err.to_string())
        } else if err.is_decode() {
            RemoteError::Fatal(AppError::Network(err))
        } else if let Some(status) = err.status() {
            if status.as_u16() == 429 || status.is_server_error() {
                RemoteError::RateLimited(err.to_string())
            } else {
                RemoteError::Fatal(AppError::Network(err))
            }
        } else {
            RemoteError::Network(err.to_string())
        }
    }
}

impl From<AppError> for RemoteError {
    fn from(err: AppError) -> Self {
        RemoteError::Fatal(err)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub rate_limit_multiplier: f64,
    pub network_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
            rate_limit_multiplier: 2.0,
            network_multiplier: 2.5,
        }
    }
}

impl RetryPolicy {
    /// 给定当前退避时间和错误，计算下一次退避时间（封顶）
    pub fn next_backoff(&self, current: Duration, error: &RemoteError) -> Duration {
        let factor = match error {
            RemoteError::Network(_) => self.network_multiplier,
            _ => self.rate_limit_multiplier,
        };
        Duration::try_from_secs_f64(current.as_secs_f64() * factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// 所有远程 API 调用的唯一入口：串行化调用间隔并负责退避重试。
pub struct RateLimitedCaller {
    policy: RetryPolicy,
    min_interval: Duration,
    last_call: TokioMutex<Option<Instant>>,
}

impl RateLimitedCaller {
    pub fn new(policy: RetryPolicy, min_interval: Duration) -> Self {
        Self {
            policy,
            min_interval,
            last_call: TokioMutex::new(None),
        }
    }

    pub async fn call<T, F, Fut>(&self, method: &str, operation: F) -> AppResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut backoff = self.policy.initial_backoff;
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let result = {
                // 间隔检查、调用本身和时间戳记录在同一把锁内完成
                let mut last_call = self.last_call.lock().await;
                if let Some(previous) = *last_call {
                    let elapsed = previous.elapsed();
                    if elapsed < self.min_interval {
                        tokio::time::sleep(self.min_interval - elapsed).await;
                    }
                }
                let result = operation().await;
                *last_call = Some(Instant::now());
                result
            };

            match result {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("远程调用 '{}' 在第 {} 次尝试时成功", method, attempt);
                    }
                    return Ok(value);
                }
                Err(RemoteError::Fatal(e)) => {
                    debug!("远程调用 '{}' 遇到不可重试的错误: {}", method, e);
                    return Err(e);
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt == max_attempts {
                        break;
                    }
                    warn!(
                        "远程调用 '{}' 失败 ({}), 第 {}/{} 次重试将在 {:.1}s 后进行",
                        method,
                        e,
                        attempt,
                        max_attempts,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = self.policy.next_backoff(backoff, &e);
                }
            }
        }

        Err(AppError::RetriesExhausted {
            method: method.to_string(),
            attempts: max_attempts,
            last: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_multipliers_and_cap() {
        let policy = RetryPolicy::default();
        let two = Duration::from_secs(2);
        assert_eq!(
            policy.next_backoff(two, &RemoteError::RateLimited("429".into())),
            Duration::from_secs(4)
        );
        assert_eq!(
            policy.next_backoff(two, &RemoteError::Network("timeout".into())),
            Duration::from_secs(5)
        );
        assert_eq!(
            policy.next_backoff(Duration::from_secs(40), &RemoteError::Network("x".into())),
            Duration::from_secs(60)
        );
        // 溢出时停在上限
        let huge = RetryPolicy {
            max_backoff: Duration::MAX,
            ..RetryPolicy::default()
        };
        assert_eq!(
            huge.next_backoff(Duration::MAX, &RemoteError::RateLimited("x".into())),
            Duration::MAX
        );
    }

    #[tokio::test]
    async fn test_min_interval_is_enforced_between_calls() {
        let caller = RateLimitedCaller::new(RetryPolicy::default(), Duration::from_millis(100));
        let start = Instant::now();
        for _ in 0..3 {
            caller
                .call("noop", || async { Ok::<_, RemoteError>(()) })
                .await
                .unwrap();
        }
        // 三次调用之间至少有两个间隔
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
