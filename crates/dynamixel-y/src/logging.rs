//! 日志初始化
//!
//! 驱动内部使用 `tracing` 输出日志：打开/关闭为 info，模式与力矩切换为 debug，
//! 重试预算耗尽为 warn，轮询进度为 trace。依赖 `log` 的第三方库通过
//! `tracing-log` 桥接到同一个订阅者。

use tracing_subscriber::EnvFilter;

/// 默认过滤规则（`RUST_LOG` 未设置时使用）
pub const DEFAULT_FILTER: &str = "info";

/// 初始化日志：优先使用 `RUST_LOG`，否则使用 [`DEFAULT_FILTER`]
///
/// 重复调用是安全的，已经安装订阅者时直接返回。
pub fn init_logger() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter);
}

/// 使用指定的过滤规则初始化日志（如 `"dynamixel_y_driver=trace"`）
pub fn init_logger_with_filter(directives: &str) {
    install(EnvFilter::new(directives));
}

fn install(filter: EnvFilter) {
    // 已经安装过 log 桥接时返回错误，忽略即可
    let _ = tracing_log::LogTracer::init();

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        log::debug!("tracing subscriber already installed");
    }
}
