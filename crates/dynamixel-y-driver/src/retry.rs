//! 事务重试
//!
//! 串口总线上的偶发失败（丢包、校验错误）很常见，每一次寄存器读/写都单独
//! 包装在 `RetryPolicy::run` 中：失败后立即重试（无退避），直到从第一次
//! 尝试开始经过的时间达到预算，再把最后一次失败原样返回。

use crate::clock::Clock;
use crate::diagnostics::DiagnosticSink;
use crate::error::DriverError;
use std::time::Duration;
use tracing::warn;

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 单次事务的时间预算
    pub budget: Duration,
}

impl RetryPolicy {
    /// 默认预算：1 秒
    pub const DEFAULT_BUDGET: Duration = Duration::from_secs(1);

    pub const fn new(budget: Duration) -> Self {
        Self { budget }
    }

    /// 执行事务，可重试的失败在预算内立即重试
    ///
    /// 只有 [`DriverError::is_retryable`] 为真的错误会被重试，其余错误立即返回。
    /// 每次重试前把失败描述交给 `sink`。
    pub fn run<T, F>(
        &self,
        clock: &dyn Clock,
        sink: &dyn DiagnosticSink,
        mut transaction: F,
    ) -> Result<T, DriverError>
    where
        F: FnMut() -> Result<T, DriverError>,
    {
        let deadline = clock.now() + self.budget;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let error = match transaction() {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            if clock.now() >= deadline {
                warn!(
                    attempts,
                    budget_ms = self.budget.as_millis() as u64,
                    "Retry budget exhausted: {}",
                    error
                );
                return Err(error);
            }

            sink.on_retry(&error.to_string());
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BUDGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, SystemClock};
    use crate::diagnostics::NoopSink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn protocol_error(n: usize) -> DriverError {
        DriverError::Protocol {
            context: format!("Read failed for PRESENT_POSITION (attempt {n})"),
            detail: "[TxRxResult] There is no status packet!".to_string(),
        }
    }

    #[test]
    fn test_success_on_first_attempt() {
        let calls = AtomicUsize::new(0);
        let sink = |_: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
        };
        let value = RetryPolicy::default()
            .run(&SystemClock, &sink, || Ok::<_, DriverError>(7))
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fail_twice_then_succeed() {
        let sink_calls = AtomicUsize::new(0);
        let sink = |_: &str| {
            sink_calls.fetch_add(1, Ordering::SeqCst);
        };
        let mut attempt = 0;

        let value = RetryPolicy::default()
            .run(&SystemClock, &sink, || {
                attempt += 1;
                if attempt <= 2 {
                    Err(protocol_error(attempt))
                } else {
                    Ok(attempt)
                }
            })
            .unwrap();

        assert_eq!(value, 3);
        assert_eq!(sink_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_budget_exhausted_returns_last_failure() {
        // 每次读时钟前进 300ms：截止时间 = 300 + 1000，第 1..3 次失败后
        // 时间为 600/900/1200（< 1300，重试），第 4 次失败后为 1500（放弃）
        let clock = ManualClock::with_auto_advance(Duration::from_millis(300));
        let sink_calls = AtomicUsize::new(0);
        let sink = |_: &str| {
            sink_calls.fetch_add(1, Ordering::SeqCst);
        };
        let mut attempt = 0;

        let err = RetryPolicy::default()
            .run(&clock, &sink, || -> Result<(), DriverError> {
                attempt += 1;
                Err(protocol_error(attempt))
            })
            .unwrap_err();

        assert_eq!(attempt, 4);
        assert_eq!(sink_calls.load(Ordering::SeqCst), 3);
        assert!(err.to_string().contains("attempt 4"));
    }

    #[test]
    fn test_zero_budget_tries_once() {
        let mut attempt = 0;
        let err = RetryPolicy::new(Duration::ZERO)
            .run(&ManualClock::new(), &NoopSink, || -> Result<(), DriverError> {
                attempt += 1;
                Err(protocol_error(attempt))
            })
            .unwrap_err();
        assert_eq!(attempt, 1);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_non_retryable_error_propagates_immediately() {
        let mut attempt = 0;
        let err = RetryPolicy::default()
            .run(&SystemClock, &NoopSink, || -> Result<(), DriverError> {
                attempt += 1;
                Err(DriverError::Config("bad".to_string()))
            })
            .unwrap_err();
        assert_eq!(attempt, 1);
        assert!(matches!(err, DriverError::Config(_)));
    }
}
