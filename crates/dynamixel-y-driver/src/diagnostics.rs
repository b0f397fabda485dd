//! 诊断回调
//!
//! 每次事务失败并即将重试时，驱动把失败描述交给 `DiagnosticSink`。
//! 每个执行器实例持有自己的 sink（通过 `ActuatorBuilder` 注入），默认不输出。

use tracing::debug;

/// 重试诊断接收端
pub trait DiagnosticSink: Send + Sync {
    /// 一次失败的尝试即将被重试
    fn on_retry(&self, message: &str);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_retry(&self, message: &str) {
        self(message)
    }
}

/// 丢弃所有诊断信息（默认）
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn on_retry(&self, _message: &str) {}
}

/// 转发到 `tracing`（debug 级别）
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn on_retry(&self, message: &str) {
        debug!(target: "dynamixel_y::retry", "{}", message);
    }
}
