//! 时钟抽象
//!
//! 重试预算和等待超时都通过 `Clock` 读取当前时间，测试中可以替换为
//! `ManualClock` 以获得确定性的时间推进。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 单调时钟
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// 系统单调时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// 手动推进的时钟（测试用）
///
/// 每次调用 `now()` 都会先自动推进 `auto_advance`，从而让
/// "每次尝试消耗固定时间" 的场景可以被精确复现。
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_nanos: AtomicU64,
    auto_advance_nanos: u64,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_nanos: AtomicU64::new(0),
            auto_advance_nanos: 0,
        }
    }

    /// 每次读取时间时自动前进 `step`
    pub fn with_auto_advance(step: Duration) -> Self {
        Self {
            auto_advance_nanos: duration_nanos(step),
            ..Self::new()
        }
    }

    /// 手动前进 `delta`
    pub fn advance(&self, delta: Duration) {
        self.offset_nanos
            .fetch_add(duration_nanos(delta), Ordering::SeqCst);
    }

    /// 自创建以来经过的（虚拟）时间
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let previous = self
            .offset_nanos
            .fetch_add(self.auto_advance_nanos, Ordering::SeqCst);
        self.origin + Duration::from_nanos(previous + self.auto_advance_nanos)
    }
}

fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
