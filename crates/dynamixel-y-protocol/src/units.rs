//! 单位换算
//!
//! 协议整数单位与物理单位之间的纯函数转换：
//!
//! | 物理量 | 协议单位 | 换算 |
//! |---|---|---|
//! | 位置 | pulse（524288 / 圈） | `deg * 524288 / 360` |
//! | 速度 | CRPM（0.01 rev/min） | `deg/s / 0.06` |
//! | 电流 | 0.01 A | `/ 100` |
//! | 电压 | 0.1 V | `/ 10` |
//! | 温度 | 1 ℃ | 不缩放 |
//!
//! 转换到整数单位时取整（四舍六入五取偶），往返转换有损，
//! 回显实际下发的设定值时应使用换算回来的值而不是输入值。

/// 每度对应的脉冲数
pub const PULSES_PER_DEGREE: f64 = 524_288.0 / 360.0;

/// 每 deg/s 对应的 CRPM 数（1 CRPM = 0.01 rev/min = 0.06 deg/s）
pub const CRPM_PER_DEGREE_PER_SECOND: f64 = 1.0 / 0.06;

/// 角度 → 脉冲（取整）
#[inline]
pub fn degrees_to_pulses(degrees: f64) -> i64 {
    (degrees * PULSES_PER_DEGREE).round_ties_even() as i64
}

/// 脉冲 → 角度
#[inline]
pub fn pulses_to_degrees(pulses: i64) -> f64 {
    pulses as f64 / PULSES_PER_DEGREE
}

/// deg/s → CRPM（取整）
#[inline]
pub fn dps_to_crpm(degrees_per_second: f64) -> i64 {
    (degrees_per_second * CRPM_PER_DEGREE_PER_SECOND).round_ties_even() as i64
}

/// CRPM → deg/s
#[inline]
pub fn crpm_to_dps(crpm: i64) -> f64 {
    crpm as f64 / CRPM_PER_DEGREE_PER_SECOND
}

/// 电流原始值 → A
#[inline]
pub fn raw_to_amperes(raw: i64) -> f64 {
    raw as f64 / 100.0
}

/// 电压原始值 → V
#[inline]
pub fn raw_to_volts(raw: i64) -> f64 {
    raw as f64 / 10.0
}

/// 温度原始值 → ℃
#[inline]
pub fn raw_to_celsius(raw: i64) -> i64 {
    raw
}
