//! Builder 模式实现
//!
//! 提供链式构造 `Actuator` 实例的便捷方式。

use crate::actuator::Actuator;
use crate::clock::{Clock, SystemClock};
use crate::config::ActuatorConfig;
use crate::diagnostics::{DiagnosticSink, NoopSink};
use crate::error::DriverError;
use crate::retry::RetryPolicy;
use crate::wait::{CancellationToken, WaitOptions};
use dynamixel_y_transport::Transport;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Actuator Builder（链式构造）
///
/// Builder 本身可以克隆和复用，总线扫描会用同一个 Builder 依次尝试每个端口。
///
/// # Example
///
/// ```no_run
/// # #[cfg(feature = "mock")]
/// # {
/// use dynamixel_y_driver::ActuatorBuilder;
/// use dynamixel_y_transport::{MockDevice, MockTransport};
/// use std::time::Duration;
///
/// let (transport, _device) = MockTransport::with_device("mock0", MockDevice::new());
/// let actuator = ActuatorBuilder::new()
///     .device_id(1)
///     .retry_budget(Duration::from_millis(500))
///     .wait_timeout(Duration::from_secs(5))
///     .open(transport)
///     .unwrap();
/// # }
/// ```
#[derive(Clone)]
pub struct ActuatorBuilder {
    pub(crate) device_id: u8,
    pub(crate) baud_rate: u32,
    retry: RetryPolicy,
    wait: WaitOptions,
    sink: Arc<dyn DiagnosticSink>,
    clock: Arc<dyn Clock>,
}

impl ActuatorBuilder {
    pub fn new() -> Self {
        Self::from_config(&ActuatorConfig::default(), None)
    }

    fn from_config(config: &ActuatorConfig, cancel: Option<CancellationToken>) -> Self {
        Self {
            device_id: config.device_id,
            baud_rate: config.baud_rate,
            retry: config.retry_policy(),
            wait: WaitOptions {
                cancel,
                ..config.wait_options()
            },
            sink: Arc::new(NoopSink),
            clock: Arc::new(SystemClock),
        }
    }

    /// 使用完整配置（覆盖之前设置的 ID、波特率、预算和等待参数）
    ///
    /// 已设置的取消令牌、诊断接收端和时钟保持不变。
    pub fn config(self, config: ActuatorConfig) -> Self {
        Self {
            sink: self.sink,
            clock: self.clock,
            ..Self::from_config(&config, self.wait.cancel)
        }
    }

    /// 设置设备 ID（默认 1）
    pub fn device_id(mut self, device_id: u8) -> Self {
        self.device_id = device_id;
        self
    }

    /// 设置波特率（默认 1 000 000）
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// 设置单次事务的重试预算（默认 1 秒）
    ///
    /// 预算按原样保存，不截断到毫秒。
    pub fn retry_budget(mut self, budget: Duration) -> Self {
        self.retry = RetryPolicy::new(budget);
        self
    }

    /// 设置阻塞等待的超时（默认无限等待）
    pub fn wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait.timeout = Some(timeout);
        self
    }

    /// 设置阻塞等待的轮询间隔（默认忙轮询）
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.wait.poll_interval = interval;
        self
    }

    /// 一次性设置等待选项（包括取消令牌）
    pub fn wait_options(mut self, options: WaitOptions) -> Self {
        self.wait = options;
        self
    }

    /// 设置取消令牌
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.wait.cancel = Some(token);
        self
    }

    /// 设置重试诊断接收端
    pub fn diagnostic_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// 设置时钟（测试中注入 `ManualClock`）
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub(crate) fn build_wait_options(&self) -> WaitOptions {
        self.wait.clone()
    }

    pub(crate) fn sink(&self) -> Arc<dyn DiagnosticSink> {
        Arc::clone(&self.sink)
    }

    pub(crate) fn clock_handle(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// 在 `transport` 上打开执行器
    ///
    /// 打开端口、设置波特率、Ping 设备并使能力矩，见 [`Actuator::open`]。
    pub fn open<T: Transport>(&self, transport: T) -> Result<Actuator<T>, DriverError> {
        Actuator::open(transport, self)
    }
}

impl Default for ActuatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ActuatorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActuatorBuilder")
            .field("device_id", &self.device_id)
            .field("baud_rate", &self.baud_rate)
            .field("retry", &self.retry)
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}
