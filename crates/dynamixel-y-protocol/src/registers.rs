//! 寄存器目录
//!
//! 型号 YM080-230-R051-RH 的控制表中，驱动用到的寄存器。
//! 参考：<https://emanual.robotis.com/docs/en/dxl/y/ym080-230-r051-rh/>
//!
//! 目录是编译期常量，进程内只读。名称使用枚举表示，
//! 因此"未知寄存器名"是编译错误而不是运行时错误。

use crate::ProtocolError;
use std::fmt;

/// 寄存器字节宽度
///
/// 宽度在构造 [`Register`] 时确定，读写时按枚举分派到对应的
/// 1/2/4 字节事务，编译器保证分派的穷尽性。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum RegisterWidth {
    /// 1 字节
    U8 = 1,
    /// 2 字节
    U16 = 2,
    /// 4 字节
    U32 = 4,
}

impl RegisterWidth {
    /// 字节数
    pub const fn bytes(self) -> u8 {
        self as u8
    }

    /// 位数
    pub const fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }

    /// 按补码将无符号原始值解释为有符号整数
    ///
    /// `raw >= 2^(8N-1)` 时结果为 `raw - 2^(8N)`。
    /// 超出宽度的高位会被忽略。
    ///
    /// # 示例
    ///
    /// ```rust
    /// use dynamixel_y_protocol::RegisterWidth;
    ///
    /// assert_eq!(RegisterWidth::U8.decode_signed(255), -1);
    /// assert_eq!(RegisterWidth::U8.decode_signed(127), 127);
    /// assert_eq!(RegisterWidth::U32.decode_signed(u32::MAX), -1);
    /// ```
    pub const fn decode_signed(self, raw: u32) -> i64 {
        match self {
            RegisterWidth::U8 => raw as u8 as i8 as i64,
            RegisterWidth::U16 => raw as u16 as i16 as i64,
            RegisterWidth::U32 => raw as i32 as i64,
        }
    }

    /// 可写入的最小值（有符号下界）
    pub const fn min_value(self) -> i64 {
        -(1i64 << (self.bits() - 1))
    }

    /// 可写入的最大值（无符号上界）
    pub const fn max_value(self) -> i64 {
        (1i64 << self.bits()) - 1
    }

    /// 值是否能被该宽度表示
    pub const fn fits(self, value: i64) -> bool {
        value >= self.min_value() && value <= self.max_value()
    }

    /// 截断到该宽度的原始位模式（负数按补码）
    const fn truncate(self, value: i64) -> u32 {
        (value as u64 & ((1u64 << self.bits()) - 1)) as u32
    }
}

impl fmt::Display for RegisterWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bytes())
    }
}

/// 寄存器描述符（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Register {
    /// 控制表中的名称
    pub name: &'static str,
    /// 控制表地址
    pub address: u16,
    /// 字节宽度
    pub width: RegisterWidth,
}

impl Register {
    pub const fn new(name: &'static str, address: u16, width: RegisterWidth) -> Self {
        Self {
            name,
            address,
            width,
        }
    }

    /// 将原始读数解码为有符号整数
    pub const fn decode(&self, raw: u32) -> i64 {
        self.width.decode_signed(raw)
    }

    /// 将待写入的整数编码为原始位模式
    ///
    /// # 错误
    ///
    /// 值超出 `[-2^(8N-1), 2^(8N) - 1]` 时返回 `ProtocolError::ValueOutOfRange`。
    pub fn encode(&self, value: i64) -> Result<u32, ProtocolError> {
        if !self.width.fits(value) {
            return Err(ProtocolError::ValueOutOfRange {
                register: self.name,
                value,
                width: self.width.bytes(),
            });
        }
        Ok(self.width.truncate(value))
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 寄存器名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterName {
    OperatingMode,
    VelocityLimit,
    ControllerState,
    ProfileVelocity,
    TorqueEnable,
    GoalVelocity,
    GoalPosition,
    PresentCurrent,
    PresentVelocity,
    PresentPosition,
    PresentInputVoltage,
    PresentInverterTemperature,
    PresentMotorTemperature,
}

pub const OPERATING_MODE: Register = Register::new("OPERATING_MODE", 33, RegisterWidth::U8);
pub const VELOCITY_LIMIT: Register = Register::new("VELOCITY_LIMIT", 72, RegisterWidth::U32);
pub const CONTROLLER_STATE: Register = Register::new("CONTROLLER_STATE", 152, RegisterWidth::U8);
pub const PROFILE_VELOCITY: Register = Register::new("PROFILE_VELOCITY", 244, RegisterWidth::U32);
pub const TORQUE_ENABLE: Register = Register::new("TORQUE_ENABLE", 512, RegisterWidth::U8);
pub const GOAL_VELOCITY: Register = Register::new("GOAL_VELOCITY", 528, RegisterWidth::U32);
pub const GOAL_POSITION: Register = Register::new("GOAL_POSITION", 532, RegisterWidth::U32);
pub const PRESENT_CURRENT: Register = Register::new("PRESENT_CURRENT", 546, RegisterWidth::U16);
pub const PRESENT_VELOCITY: Register = Register::new("PRESENT_VELOCITY", 548, RegisterWidth::U32);
pub const PRESENT_POSITION: Register = Register::new("PRESENT_POSITION", 552, RegisterWidth::U32);
pub const PRESENT_INPUT_VOLTAGE: Register =
    Register::new("PRESENT_INPUT_VOLTAGE", 568, RegisterWidth::U16);
pub const PRESENT_INVERTER_TEMPERATURE: Register =
    Register::new("PRESENT_INVERTER_TEMPERATURE", 570, RegisterWidth::U8);
pub const PRESENT_MOTOR_TEMPERATURE: Register =
    Register::new("PRESENT_MOTOR_TEMPERATURE", 571, RegisterWidth::U8);

impl RegisterName {
    /// 目录中的全部寄存器（按地址升序）
    pub const ALL: [RegisterName; 13] = [
        RegisterName::OperatingMode,
        RegisterName::VelocityLimit,
        RegisterName::ControllerState,
        RegisterName::ProfileVelocity,
        RegisterName::TorqueEnable,
        RegisterName::GoalVelocity,
        RegisterName::GoalPosition,
        RegisterName::PresentCurrent,
        RegisterName::PresentVelocity,
        RegisterName::PresentPosition,
        RegisterName::PresentInputVoltage,
        RegisterName::PresentInverterTemperature,
        RegisterName::PresentMotorTemperature,
    ];

    /// 查找寄存器描述符
    pub const fn register(self) -> Register {
        match self {
            RegisterName::OperatingMode => OPERATING_MODE,
            RegisterName::VelocityLimit => VELOCITY_LIMIT,
            RegisterName::ControllerState => CONTROLLER_STATE,
            RegisterName::ProfileVelocity => PROFILE_VELOCITY,
            RegisterName::TorqueEnable => TORQUE_ENABLE,
            RegisterName::GoalVelocity => GOAL_VELOCITY,
            RegisterName::GoalPosition => GOAL_POSITION,
            RegisterName::PresentCurrent => PRESENT_CURRENT,
            RegisterName::PresentVelocity => PRESENT_VELOCITY,
            RegisterName::PresentPosition => PRESENT_POSITION,
            RegisterName::PresentInputVoltage => PRESENT_INPUT_VOLTAGE,
            RegisterName::PresentInverterTemperature => PRESENT_INVERTER_TEMPERATURE,
            RegisterName::PresentMotorTemperature => PRESENT_MOTOR_TEMPERATURE,
        }
    }
}

impl From<RegisterName> for Register {
    fn from(name: RegisterName) -> Self {
        name.register()
    }
}

impl fmt::Display for RegisterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.register().name)
    }
}
