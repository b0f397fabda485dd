//! # DYNAMIXEL-Y Transport Layer
//!
//! 寄存器事务传输层抽象。
//!
//! 底层的串口收发与 Protocol 2.0 组包由外部驱动库提供，本 crate 只定义
//! 驱动层需要的能力：按设备 ID、寄存器地址和字节宽度执行一次读/写事务，
//! 返回值、通信结果码和设备错误字节。
//!
//! ```text
//! Driver Layer (dynamixel-y-driver)
//!     ↓ read_u8/u16/u32, write_u8/u16/u32
//! Transport (此 trait)
//!     ↓ 外部 Protocol 2.0 实现
//! Serial bus / Hardware
//! ```

use dynamixel_y_protocol::{CommResult, PROTOCOL_VERSION, packet_error_text};
use thiserror::Error;

#[cfg(feature = "serial")]
pub mod serial;

#[cfg(feature = "serial")]
pub use serial::SerialPortEnumerator;

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockDevice, MockFailure, MockTransaction, MockTransport, SharedMockDevice};

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// 打开端口失败
    #[error("Unable to open port {port}")]
    OpenFailed { port: String },

    /// 设置波特率失败
    #[error("Unable to set baud rate {baud_rate} on {port}")]
    BaudRateRejected { port: String, baud_rate: u32 },

    /// 枚举串口失败
    #[error("Port enumeration failed: {0}")]
    Enumeration(String),

    #[cfg(feature = "serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// 单次事务的结果
///
/// 与底层 SDK 的 `(value, result, error)` 三元组一一对应。只有
/// `result == CommResult::Success` 且 `error == 0` 时事务才算成功。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxRx<T> {
    /// 读取到的值（失败时无意义）
    pub value: T,
    /// 通信结果码
    pub result: CommResult,
    /// 状态包中的设备错误字节
    pub error: u8,
}

impl<T> TxRx<T> {
    /// 成功的事务
    pub fn success(value: T) -> Self {
        Self {
            value,
            result: CommResult::Success,
            error: 0,
        }
    }

    /// 通信失败的事务
    pub fn comm_failure(value: T, result: CommResult) -> Self {
        Self {
            value,
            result,
            error: 0,
        }
    }

    /// 设备返回错误的事务
    pub fn device_error(value: T, error: u8) -> Self {
        Self {
            value,
            result: CommResult::Success,
            error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_success() && self.error == 0
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TxRx<U> {
        TxRx {
            value: f(self.value),
            result: self.result,
            error: self.error,
        }
    }
}

/// 寄存器事务传输能力
///
/// 一个实例对应一个串口会话，由单个驱动实例独占使用。
/// 协议没有容忍交错请求的分帧，实现不需要也不应该支持并发访问。
pub trait Transport {
    /// 端口名称（如 "/dev/ttyUSB0" 或 "COM3"）
    fn port_name(&self) -> &str;

    /// 打开端口
    fn open_port(&mut self) -> Result<(), TransportError>;

    /// 设置波特率
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), TransportError>;

    /// 当前波特率
    fn baud_rate(&self) -> u32;

    /// 关闭端口（幂等）
    fn close_port(&mut self);

    /// Ping 设备，返回型号
    fn ping(&mut self, id: u8) -> TxRx<u16>;

    fn read_u8(&mut self, id: u8, address: u16) -> TxRx<u8>;

    fn read_u16(&mut self, id: u8, address: u16) -> TxRx<u16>;

    fn read_u32(&mut self, id: u8, address: u16) -> TxRx<u32>;

    fn write_u8(&mut self, id: u8, address: u16, value: u8) -> TxRx<()>;

    fn write_u16(&mut self, id: u8, address: u16, value: u16) -> TxRx<()>;

    fn write_u32(&mut self, id: u8, address: u16, value: u32) -> TxRx<()>;

    /// 事务使用的协议版本（DYNAMIXEL-Y 只支持 2.0）
    fn protocol_version(&self) -> f32 {
        PROTOCOL_VERSION
    }

    /// 通信结果码的文字描述
    ///
    /// 默认使用 Protocol 2.0 SDK 的描述文字。
    fn comm_result_text(&self, result: CommResult) -> String {
        result.text().to_string()
    }

    /// 设备错误字节的文字描述
    fn packet_error_text(&self, error: u8) -> String {
        packet_error_text(error).to_string()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn port_name(&self) -> &str {
        (**self).port_name()
    }

    fn open_port(&mut self) -> Result<(), TransportError> {
        (**self).open_port()
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), TransportError> {
        (**self).set_baud_rate(baud_rate)
    }

    fn baud_rate(&self) -> u32 {
        (**self).baud_rate()
    }

    fn close_port(&mut self) {
        (**self).close_port()
    }

    fn ping(&mut self, id: u8) -> TxRx<u16> {
        (**self).ping(id)
    }

    fn read_u8(&mut self, id: u8, address: u16) -> TxRx<u8> {
        (**self).read_u8(id, address)
    }

    fn read_u16(&mut self, id: u8, address: u16) -> TxRx<u16> {
        (**self).read_u16(id, address)
    }

    fn read_u32(&mut self, id: u8, address: u16) -> TxRx<u32> {
        (**self).read_u32(id, address)
    }

    fn write_u8(&mut self, id: u8, address: u16, value: u8) -> TxRx<()> {
        (**self).write_u8(id, address, value)
    }

    fn write_u16(&mut self, id: u8, address: u16, value: u16) -> TxRx<()> {
        (**self).write_u16(id, address, value)
    }

    fn write_u32(&mut self, id: u8, address: u16, value: u32) -> TxRx<()> {
        (**self).write_u32(id, address, value)
    }

    fn protocol_version(&self) -> f32 {
        (**self).protocol_version()
    }

    fn comm_result_text(&self, result: CommResult) -> String {
        (**self).comm_result_text(result)
    }

    fn packet_error_text(&self, error: u8) -> String {
        (**self).packet_error_text(error)
    }
}

/// 串口枚举能力（供总线扫描使用）
pub trait PortEnumerator {
    fn port_names(&self) -> Result<Vec<String>, TransportError>;
}

/// 固定的端口列表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticPorts(pub Vec<String>);

impl StaticPorts {
    pub fn new<I, S>(ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ports.into_iter().map(Into::into).collect())
    }
}

impl PortEnumerator for StaticPorts {
    fn port_names(&self) -> Result<Vec<String>, TransportError> {
        Ok(self.0.clone())
    }
}
