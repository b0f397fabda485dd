//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use dynamixel_y::prelude::*;
//! ```

// 驱动层（推荐使用）
pub use crate::driver::{Actuator, ActuatorBuilder, Telemetry};
pub use crate::driver::{CancellationToken, WaitOptions};

// 协议层常用类型
pub use crate::protocol::{OperatingMode, RegisterName};

// 传输层（常用 Trait）
pub use crate::transport::Transport;

// 错误类型
pub use crate::driver::DriverError;
pub use crate::protocol::ProtocolError;
pub use crate::transport::TransportError;
