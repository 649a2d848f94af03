//! OTP 请求限流
//!
//! 按手机号的内存固定窗口限流：窗口内超过配额后进入封禁期。单进程
//! 部署下这等价于原来集中式限流器的语义。

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Debug, Error)]
#[error("Too many OTP requests. Please try again later.")]
pub struct RateLimitError {
    pub retry_after: Duration,
}

/// 单个手机号的配额状态。
#[derive(Debug)]
struct Quota {
    count: u32,
    window_start: Instant,
    blocked_until: Option<Instant>,
}

impl Quota {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
            blocked_until: None,
        }
    }
}

pub struct OtpRateLimiter {
    quotas: RwLock<HashMap<String, Quota>>,
    max_requests: u32,
    window: Duration,
    block: Duration,
}

impl OtpRateLimiter {
    pub fn new(max_requests: u32, window: Duration, block: Duration) -> Self {
        Self {
            quotas: RwLock::new(HashMap::new()),
            max_requests,
            window,
            block,
        }
    }

    /// 默认配额：5 分钟内 3 次，超限封禁 5 分钟。
    pub fn with_defaults() -> Self {
        Self::new(3, Duration::from_secs(5 * 60), Duration::from_secs(5 * 60))
    }

    /// 消费一次配额；超限返回剩余封禁时间。
    pub fn check(&self, key: &str) -> Result<(), RateLimitError> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), RateLimitError> {
        let mut quotas = self.quotas.write().expect("rate limiter lock poisoned");
        let quota = quotas
            .entry(key.to_owned())
            .or_insert_with(|| Quota::new(now));

        if let Some(blocked_until) = quota.blocked_until {
            if now < blocked_until {
                return Err(RateLimitError {
                    retry_after: blocked_until - now,
                });
            }
            *quota = Quota::new(now);
        }

        if now.duration_since(quota.window_start) >= self.window {
            *quota = Quota::new(now);
        }

        if quota.count >= self.max_requests {
            let blocked_until = now + self.block;
            quota.blocked_until = Some(blocked_until);
            tracing::warn!(key, "otp rate limit exceeded");
            return Err(RateLimitError {
                retry_after: self.block,
            });
        }

        quota.count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_quota_then_blocks() {
        let limiter = OtpRateLimiter::new(3, Duration::from_secs(300), Duration::from_secs(300));
        let t0 = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at("+861391234", t0).is_ok());
        }
        assert!(limiter.check_at("+861391234", t0).is_err());
    }

    #[test]
    fn block_expires_after_the_block_duration() {
        let limiter = OtpRateLimiter::new(1, Duration::from_secs(60), Duration::from_secs(120));
        let t0 = Instant::now();

        assert!(limiter.check_at("k", t0).is_ok());
        assert!(limiter.check_at("k", t0).is_err());
        // 封禁期内仍被拒绝
        assert!(limiter
            .check_at("k", t0 + Duration::from_secs(119))
            .is_err());
        // 封禁结束后窗口重置
        assert!(limiter.check_at("k", t0 + Duration::from_secs(121)).is_ok());
    }

    #[test]
    fn window_resets_quota() {
        let limiter = OtpRateLimiter::new(1, Duration::from_secs(60), Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(limiter.check_at("k", t0).is_ok());
        assert!(limiter.check_at("k", t0 + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn keys_are_independent() {
        let limiter = OtpRateLimiter::new(1, Duration::from_secs(60), Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(limiter.check_at("a", t0).is_ok());
        assert!(limiter.check_at("b", t0).is_ok());
        assert!(limiter.check_at("a", t0).is_err());
    }
}
