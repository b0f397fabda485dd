//! 协议常量定义
//!
//! 包括默认通信参数、运行模式、控制器状态、通信结果码以及
//! 状态包错误字节的文字描述（Protocol 2.0）。

use crate::ProtocolError;
use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// 默认波特率（出厂后需用 DYNAMIXEL Wizard 2.0 配置为 1 Mbps）
pub const DEFAULT_BAUD_RATE: u32 = 1_000_000;

/// 默认设备 ID
pub const DEFAULT_DEVICE_ID: u8 = 1;

/// 协议版本
pub const PROTOCOL_VERSION: f32 = 2.0;

/// TORQUE_ENABLE 寄存器：使能
pub const TORQUE_ON: i64 = 1;

/// TORQUE_ENABLE 寄存器：失能
pub const TORQUE_OFF: i64 = 0;

/// 运行模式（OPERATING_MODE 寄存器）
///
/// 两种模式互斥，只能在力矩失能时切换。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum OperatingMode {
    /// 速度控制
    Velocity = 1,
    /// 位置控制
    Position = 3,
}

impl OperatingMode {
    /// 协议整数码
    pub const fn code(self) -> i64 {
        self as u8 as i64
    }

    /// 从寄存器读数解析
    pub fn from_raw(raw: i64) -> Result<Self, ProtocolError> {
        u8::try_from(raw)
            .ok()
            .and_then(|code| Self::try_from(code).ok())
            .ok_or_else(|| ProtocolError::InvalidValue {
                field: "OperatingMode".to_string(),
                value: raw,
            })
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatingMode::Velocity => f.write_str("VELOCITY"),
            OperatingMode::Position => f.write_str("POSITION"),
        }
    }
}

/// 控制器状态（CONTROLLER_STATE 寄存器）
///
/// 只关心力矩切换过程中的两个忙状态，其余取值都视为空闲。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// 正在使能力矩
    ProcessingTorqueOn,
    /// 正在失能力矩
    ProcessingTorqueOff,
    /// 其他（空闲）
    Other(i64),
}

impl ControllerState {
    pub const PROCESSING_TORQUE_ON: i64 = 4;
    pub const PROCESSING_TORQUE_OFF: i64 = 6;

    pub const fn from_raw(raw: i64) -> Self {
        match raw {
            Self::PROCESSING_TORQUE_ON => ControllerState::ProcessingTorqueOn,
            Self::PROCESSING_TORQUE_OFF => ControllerState::ProcessingTorqueOff,
            other => ControllerState::Other(other),
        }
    }

    /// 力矩切换是否仍在进行
    pub const fn is_torque_transition(self) -> bool {
        matches!(
            self,
            ControllerState::ProcessingTorqueOn | ControllerState::ProcessingTorqueOff
        )
    }
}

/// 通信结果码（与 DYNAMIXEL SDK 的 `COMM_*` 常量一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(i32)]
pub enum CommResult {
    Success = 0,
    PortBusy = -1000,
    TxFail = -1001,
    RxFail = -1002,
    TxError = -2000,
    RxWaiting = -3000,
    RxTimeout = -3001,
    RxCorrupt = -3002,
    NotAvailable = -9000,
    #[num_enum(catch_all)]
    Unknown(i32),
}

impl CommResult {
    /// 原始结果码
    pub const fn code(self) -> i32 {
        match self {
            CommResult::Success => 0,
            CommResult::PortBusy => -1000,
            CommResult::TxFail => -1001,
            CommResult::RxFail => -1002,
            CommResult::TxError => -2000,
            CommResult::RxWaiting => -3000,
            CommResult::RxTimeout => -3001,
            CommResult::RxCorrupt => -3002,
            CommResult::NotAvailable => -9000,
            CommResult::Unknown(code) => code,
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, CommResult::Success)
    }

    /// 文字描述
    pub const fn text(self) -> &'static str {
        match self {
            CommResult::Success => "[TxRxResult] Communication success!",
            CommResult::PortBusy => "[TxRxResult] Port is in use!",
            CommResult::TxFail => "[TxRxResult] Failed transmit instruction packet!",
            CommResult::RxFail => "[TxRxResult] Failed get status packet from device!",
            CommResult::TxError => "[TxRxResult] Incorrect instruction packet!",
            CommResult::RxWaiting => "[TxRxResult] Now receiving status packet!",
            CommResult::RxTimeout => "[TxRxResult] There is no status packet!",
            CommResult::RxCorrupt => "[TxRxResult] Incorrect status packet!",
            CommResult::NotAvailable => "[TxRxResult] Protocol does not support this function!",
            CommResult::Unknown(_) => "",
        }
    }
}

impl From<CommResult> for i32 {
    fn from(result: CommResult) -> Self {
        result.code()
    }
}

impl fmt::Display for CommResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// 状态包错误字节的告警位（硬件错误）
pub const ERRBIT_ALERT: u8 = 0x80;

pub const ERRNUM_RESULT_FAIL: u8 = 1;
pub const ERRNUM_INSTRUCTION: u8 = 2;
pub const ERRNUM_CRC: u8 = 3;
pub const ERRNUM_DATA_RANGE: u8 = 4;
pub const ERRNUM_DATA_LENGTH: u8 = 5;
pub const ERRNUM_DATA_LIMIT: u8 = 6;
pub const ERRNUM_ACCESS: u8 = 7;

/// 状态包错误字节的文字描述（Protocol 2.0）
///
/// 告警位优先于错误号。
pub const fn packet_error_text(error: u8) -> &'static str {
    if error & ERRBIT_ALERT != 0 {
        return "[RxPacketError] Hardware error occurred. Check the error at Control Table (Hardware Error Status)!";
    }

    match error & !ERRBIT_ALERT {
        0 => "",
        ERRNUM_RESULT_FAIL => "[RxPacketError] Failed to process the instruction packet!",
        ERRNUM_INSTRUCTION => "[RxPacketError] Undefined instruction or incorrect instruction!",
        ERRNUM_CRC => "[RxPacketError] CRC doesn't match!",
        ERRNUM_DATA_RANGE => "[RxPacketError] The data value is out of range!",
        ERRNUM_DATA_LENGTH => "[RxPacketError] The data length does not match as expected!",
        ERRNUM_DATA_LIMIT => "[RxPacketError] The data value exceeds the limit value!",
        ERRNUM_ACCESS => {
            "[RxPacketError] Writing or Reading is not available to target address!"
        },
        _ => "[RxPacketError] Unknown error code!",
    }
}
