//! # DYNAMIXEL-Y Protocol
//!
//! DYNAMIXEL-Y 执行器的寄存器协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `registers`: 寄存器目录（地址、宽度）与有符号解码
//! - `constants`: 协议常量（运行模式、控制器状态、通信结果、设备错误）
//! - `units`: 协议整数单位与物理单位之间的转换
//!
//! ## 数值表示
//!
//! 寄存器读取得到的是 N 字节无符号整数，驱动层需要按同宽度的补码
//! 重新解释为有符号整数后再做单位换算。

pub mod constants;
pub mod registers;
pub mod units;

// 重新导出常用类型
pub use constants::*;
pub use registers::{Register, RegisterName, RegisterWidth};
pub use units::*;

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 写入值超出寄存器宽度可表示的范围
    #[error("Value {value} does not fit {register} ({width} bytes)")]
    ValueOutOfRange {
        register: &'static str,
        value: i64,
        width: u8,
    },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: i64 },
}
