//! 有界重试执行器。
//!
//! 第 1 次直接执行操作；第 2..=max_retries+1 次先等待退避时间，再调用重连钩子，
//! 然后执行操作。重连钩子失败时立即结束，不再消耗剩余次数。

use std::fmt::Display;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// 重试策略。
///
/// 第 n 次（n ≥ 2）尝试前等待 `base_delay × multiplier × 2^(n-2)`，上限 `max_delay`；
/// `multiplier = 0` 时不等待。
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// 首次之外的额外尝试次数。
    pub max_retries: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            multiplier: 1.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// 不等待的策略（测试用）。
    pub fn no_wait(max_retries: u32) -> Self {
        Self {
            max_retries,
            multiplier: 0.0,
            ..Self::default()
        }
    }

    /// 总尝试次数。
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// 第 `attempt` 次尝试前的等待时间（attempt 从 1 开始）。
    pub fn delay_before(&self, attempt: u32) -> Duration {
        // NaN 与非正数都视为不等待
        if attempt < 2 || !(self.multiplier > 0.0) {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier * 2f64.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .map(|delay| delay.min(self.max_delay))
            .unwrap_or(self.max_delay)
    }
}

/// 重试结束时的错误。
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// 用完全部尝试次数，携带最后一次错误。
    #[error("gave up after {attempts} attempts: {error}")]
    Exhausted { attempts: u32, error: E },

    /// 第 `attempt` 次尝试前的重连失败。
    #[error("reconnect before attempt {attempt} failed: {error}")]
    Reconnect { attempt: u32, error: E },
}

impl<E> RetryError<E> {
    pub fn error(&self) -> &E {
        match self {
            Self::Exhausted { error, .. } | Self::Reconnect { error, .. } => error,
        }
    }

    pub fn into_error(self) -> E {
        match self {
            Self::Exhausted { error, .. } | Self::Reconnect { error, .. } => error,
        }
    }

    /// 实际执行过的操作次数。
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
            Self::Reconnect { attempt, .. } => attempt.saturating_sub(1),
        }
    }
}

/// 带重连钩子的重试执行器。
///
/// 操作与钩子通过同一个 `&mut S` 访问共享状态（通常是连接句柄），
/// 读、写请求共用这一个执行器。
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 执行操作，失败时按策略等待、重连、重试。
    pub fn execute<S, T, E, Op, Hook>(
        &self,
        target: &mut S,
        mut operation: Op,
        mut reconnect: Hook,
    ) -> Result<T, RetryError<E>>
    where
        Op: FnMut(&mut S) -> Result<T, E>,
        Hook: FnMut(&mut S) -> Result<(), E>,
        E: Display,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 1u32;
        loop {
            match operation(target) {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(target: "cip.retry", attempt = attempt, "retry_succeeded");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if attempt >= max_attempts {
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            error,
                        });
                    }
                    warn!(
                        target: "cip.retry",
                        attempt = attempt,
                        max_attempts = max_attempts,
                        error = %error,
                        "attempt_failed"
                    );
                }
            }

            attempt += 1;
            let delay = self.policy.delay_before(attempt);
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            if let Err(error) = reconnect(target) {
                warn!(
                    target: "cip.retry",
                    attempt = attempt,
                    error = %error,
                    "reconnect_failed"
                );
                return Err(RetryError::Reconnect { attempt, error });
            }
        }
    }
}
