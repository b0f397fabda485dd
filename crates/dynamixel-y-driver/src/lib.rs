//! 驱动层模块
//!
//! 本模块提供单个 DYNAMIXEL-Y 执行器的控制功能，包括：
//! - 寄存器读写（按宽度分派、补码解码、失败文字解码）
//! - 事务重试（时间预算内立即重试，诊断回调）
//! - 力矩/工作模式状态机
//! - 位置、速度设定与阻塞收敛
//! - 遥测读取
//! - 总线扫描
//!
//! # 使用场景
//!
//! 所有操作都是同步阻塞的，每个事务在独占的传输层上顺序执行。
//! 大多数用户应该通过 `dynamixel-y` facade crate 使用本模块。

mod actuator;
mod builder;
pub mod clock;
pub mod config;
pub mod diagnostics;
mod error;
pub mod retry;
pub mod scanner;
pub mod wait;

pub use actuator::{Actuator, Telemetry};
pub use builder::ActuatorBuilder;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ActuatorConfig, WaitConfig};
pub use diagnostics::{DiagnosticSink, NoopSink, TracingSink};
pub use error::DriverError;
pub use retry::RetryPolicy;
#[cfg(feature = "serial")]
pub use scanner::scan_serial_ports;
pub use scanner::scan;
pub use wait::{CancellationToken, WaitOptions};
