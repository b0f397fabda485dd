//! 驱动层错误类型定义

use dynamixel_y_protocol::ProtocolError;
use dynamixel_y_transport::TransportError;
use thiserror::Error;

/// 驱动层错误类型
///
/// # 传播策略
///
/// - `Port`: 初始化时打开端口或设置波特率失败，不重试
/// - `Protocol`: 单次寄存器事务失败，由重试包装器在预算内自动重试，
///   预算耗尽后原样向上传播
/// - `NotFound`: 总线扫描没有找到任何响应的设备
/// - `UnexpectedValue` / `InvalidArgument`: 读回的值或传入的参数无效，不重试
#[derive(Error, Debug)]
pub enum DriverError {
    /// 端口错误（打开端口或设置波特率失败）
    #[error("Port error on {port}: {source}")]
    Port {
        port: String,
        #[source]
        source: TransportError,
    },

    /// 寄存器事务失败（通信结果非成功，或设备错误字节非零）
    ///
    /// `context` 描述具体的寄存器/操作，`detail` 是解码后的失败原因。
    #[error("{context}. {detail}")]
    Protocol { context: String, detail: String },

    /// 扫描未找到设备
    #[error("DYNAMIXEL-Y not found (ports tried: {ports:?})")]
    NotFound { ports: Vec<String> },

    /// 等待超时（仅在设置了等待超时的情况下出现）
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// 等待被取消
    #[error("{operation} cancelled")]
    Cancelled { operation: &'static str },

    /// 设备返回了无法识别的寄存器值（如未知的工作模式）
    #[error("Unexpected value {value} read from {register}")]
    UnexpectedValue {
        register: &'static str,
        value: i64,
    },

    /// 参数不是有限数值
    #[error("Invalid argument {name}: {value}")]
    InvalidArgument { name: &'static str, value: f64 },

    /// 寄存器值编码错误
    #[error("Encoding error: {0}")]
    Encoding(#[from] ProtocolError),

    /// 传输层错误（如串口枚举失败）
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(String),
}

impl DriverError {
    /// 是否可以由重试包装器自动重试
    ///
    /// 只有单次寄存器事务的失败是可重试的。
    pub fn is_retryable(&self) -> bool {
        matches!(self, DriverError::Protocol { .. })
    }
}
