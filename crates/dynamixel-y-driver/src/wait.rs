//! 阻塞等待
//!
//! 力矩切换和位置/速度收敛都是 "反复读取直到条件成立" 的轮询循环。
//! 默认行为是无超时、无休眠的忙轮询；调用方可以通过 `WaitOptions`
//! 设置超时、轮询间隔和取消令牌。

use crate::clock::Clock;
use crate::error::DriverError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 取消令牌
///
/// 克隆共享同一个标志，可以从其他线程调用 `cancel()` 中断正在进行的等待。
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// 清除取消标志，令牌可以再次使用
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// 阻塞等待选项
#[derive(Debug, Clone, Default)]
pub struct WaitOptions {
    /// 超时时间（`None` 表示无限等待）
    pub timeout: Option<Duration>,
    /// 两次轮询之间的休眠（`Duration::ZERO` 表示忙轮询）
    pub poll_interval: Duration,
    /// 取消令牌
    pub cancel: Option<CancellationToken>,
}

impl WaitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// 轮询 `condition` 直到返回 `true`
///
/// 每一轮先检查条件，再检查取消和超时，最后按 `poll_interval` 休眠。
/// `condition` 返回的错误直接向上传播。
pub(crate) fn wait_until<F>(
    options: &WaitOptions,
    clock: &dyn Clock,
    operation: &'static str,
    mut condition: F,
) -> Result<(), DriverError>
where
    F: FnMut() -> Result<bool, DriverError>,
{
    let deadline = options.timeout.map(|timeout| (clock.now() + timeout, timeout));

    loop {
        if condition()? {
            return Ok(());
        }

        if options
            .cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            return Err(DriverError::Cancelled { operation });
        }

        if let Some((deadline, timeout)) = deadline
            && clock.now() >= deadline
        {
            return Err(DriverError::Timeout {
                operation,
                timeout_ms: timeout.as_millis() as u64,
            });
        }

        if !options.poll_interval.is_zero() {
            spin_sleep::sleep(options.poll_interval);
        }
    }
}
