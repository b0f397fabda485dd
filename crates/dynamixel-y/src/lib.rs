//! DYNAMIXEL-Y SDK - DYNAMIXEL-Y 伺服执行器 Rust SDK
//!
//! 通过寄存器协议在串口总线上配置、控制单个执行器并读取遥测数据。
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 寄存器目录、协议常量、补码解码与单位换算
//! - **传输层** (`transport`): 寄存器事务抽象、串口枚举、Mock 设备
//! - **驱动层** (`driver`): 重试、力矩/模式状态机、阻塞收敛、遥测、总线扫描
//!
//! # 快速开始
//!
//! ```rust
//! use dynamixel_y::prelude::*;
//! ```
//!
//! 打开执行器需要一个实现了 [`Transport`] 的串口会话：
//!
//! ```rust,no_run
//! # #[cfg(feature = "mock")]
//! # {
//! use dynamixel_y::prelude::*;
//! use dynamixel_y::transport::{MockDevice, MockTransport};
//!
//! let (transport, _device) = MockTransport::with_device("mock0", MockDevice::new());
//! let mut actuator = ActuatorBuilder::new().open(transport)?;
//! let realized = actuator.set_position(90.0, Some(45.0), true)?;
//! println!("{realized:.3} deg, {}", actuator.read_telemetry()?);
//! actuator.close()?;
//! # }
//! # Ok::<(), dynamixel_y::DriverError>(())
//! ```

pub use dynamixel_y_driver as driver;
pub use dynamixel_y_protocol as protocol;
pub use dynamixel_y_transport as transport;

pub mod logging;
pub mod prelude;

// --- 用户以此为界 ---

// 协议层
pub use protocol::{OperatingMode, ProtocolError, RegisterName};

// 传输层
pub use transport::{PortEnumerator, StaticPorts, Transport, TransportError, TxRx};

// 驱动层
pub use driver::{
    Actuator, ActuatorBuilder, ActuatorConfig, CancellationToken, DiagnosticSink, DriverError,
    RetryPolicy, Telemetry, WaitOptions, scan,
};
#[cfg(feature = "serial")]
pub use driver::scan_serial_ports;
