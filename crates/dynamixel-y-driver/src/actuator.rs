//! 执行器驱动核心
//!
//! `Actuator` 独占一个已打开的传输层会话，对外提供：
//!
//! - 力矩使能/失能（等待控制器状态稳定）
//! - 工作模式切换（位置模式 / 速度模式）
//! - 位置和速度设定（可选阻塞等待收敛）
//! - 遥测读取（位置、速度、电流、电压、温度）
//!
//! 设备是唯一的状态来源：驱动在修改前重新读取寄存器，不保存影子状态。
//! 每次寄存器事务都单独经过重试包装。
//!
//! # 阻塞语义
//!
//! 阻塞操作（力矩切换、位置/速度收敛）默认**没有超时**：如果设备永远
//! 达不到目标（例如位置被外力卡住），调用会一直轮询下去。需要上限时
//! 通过 `ActuatorBuilder::wait_timeout` 或 `CancellationToken` 设置。

use crate::builder::ActuatorBuilder;
use crate::clock::Clock;
use crate::diagnostics::DiagnosticSink;
use crate::error::DriverError;
use crate::retry::RetryPolicy;
use crate::wait::{WaitOptions, wait_until};
use dynamixel_y_protocol::units::{
    crpm_to_dps, degrees_to_pulses, dps_to_crpm, pulses_to_degrees, raw_to_amperes,
    raw_to_celsius, raw_to_volts,
};
use dynamixel_y_protocol::{
    ControllerState, OperatingMode, RegisterName, RegisterWidth, TORQUE_OFF, TORQUE_ON,
};
use dynamixel_y_transport::{Transport, TxRx};
#[cfg(feature = "serde-telemetry")]
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// 单个 DYNAMIXEL-Y 执行器的控制句柄
///
/// 通过 [`ActuatorBuilder::open`] 创建，通过 [`Actuator::close`] 关闭。
/// 未显式关闭的句柄在 Drop 时会写入力矩失能并关闭端口（不等待控制器状态）。
pub struct Actuator<T: Transport> {
    transport: T,
    device_id: u8,
    model_number: u16,
    retry: RetryPolicy,
    wait: WaitOptions,
    sink: Arc<dyn DiagnosticSink>,
    clock: Arc<dyn Clock>,
    closed: bool,
}

/// 一次遥测读取的结果（物理单位）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-telemetry", derive(Serialize))]
pub struct Telemetry {
    /// 位置（度）
    pub position_deg: f64,
    /// 速度（度/秒）
    pub velocity_dps: f64,
    /// 电流（A）
    pub current_a: f64,
    /// 输入电压（V）
    pub voltage_v: f64,
    /// 逆变器温度（℃）
    pub inverter_temperature_c: i64,
    /// 电机温度（℃）
    pub motor_temperature_c: i64,
}

impl fmt::Display for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.3} deg, {:.3} deg/s, {:.2} A, {:.1} V, {} degC, {} degC",
            self.position_deg,
            self.velocity_dps,
            self.current_a,
            self.voltage_v,
            self.inverter_temperature_c,
            self.motor_temperature_c
        )
    }
}

fn ensure_finite(name: &'static str, value: f64) -> Result<(), DriverError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DriverError::InvalidArgument { name, value })
    }
}

/// 检查事务结果，失败时用传输层的文字描述构造协议错误
fn check_response<T, U>(
    transport: &T,
    context: impl FnOnce() -> String,
    txrx: &TxRx<U>,
) -> Result<(), DriverError>
where
    T: Transport + ?Sized,
{
    if !txrx.result.is_success() {
        return Err(DriverError::Protocol {
            context: context(),
            detail: transport.comm_result_text(txrx.result),
        });
    }
    if txrx.error != 0 {
        return Err(DriverError::Protocol {
            context: context(),
            detail: transport.packet_error_text(txrx.error),
        });
    }
    Ok(())
}

impl<T: Transport> Actuator<T> {
    /// 打开执行器
    ///
    /// 1. 打开端口并设置波特率（失败返回 `DriverError::Port`）
    /// 2. Ping 设备（不重试，失败返回 `DriverError::Protocol`）
    /// 3. 使能力矩
    ///
    /// 端口打开之后的任何失败都会先关闭端口再返回错误。
    pub(crate) fn open(mut transport: T, builder: &ActuatorBuilder) -> Result<Self, DriverError> {
        let port = transport.port_name().to_string();
        let baud_rate = builder.baud_rate;
        let device_id = builder.device_id;

        transport.open_port().map_err(|source| DriverError::Port {
            port: port.clone(),
            source,
        })?;

        if let Err(source) = transport.set_baud_rate(baud_rate) {
            transport.close_port();
            return Err(DriverError::Port { port, source });
        }

        let ping = transport.ping(device_id);
        let actual_baud = transport.baud_rate();
        if let Err(e) = check_response(
            &transport,
            || format!("Ping failed for {} at {} baud", port, actual_baud),
            &ping,
        ) {
            transport.close_port();
            return Err(e);
        }

        let mut actuator = Self {
            transport,
            device_id,
            model_number: ping.value,
            retry: builder.retry_policy(),
            wait: builder.build_wait_options(),
            sink: builder.sink(),
            clock: builder.clock_handle(),
            closed: false,
        };

        if let Err(e) = actuator.set_torque(true) {
            actuator.transport.close_port();
            actuator.closed = true;
            return Err(e);
        }

        info!(
            port = %port,
            baud_rate,
            protocol_version = actuator.transport.protocol_version(),
            device_id = actuator.device_id,
            model_number = actuator.model_number,
            "DYNAMIXEL-Y opened"
        );
        Ok(actuator)
    }

    /// 关闭执行器
    ///
    /// 先失能力矩，然后无论失能是否成功都关闭端口。返回力矩失能的结果。
    pub fn close(mut self) -> Result<(), DriverError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), DriverError> {
        let result = self.set_torque(false);
        self.close_transport();
        result
    }

    fn close_transport(&mut self) {
        self.transport.close_port();
        self.closed = true;
        info!(port = %self.transport.port_name(), "DYNAMIXEL-Y closed");
    }

    // ==================== 寄存器原语 ====================

    /// 在重试包装下执行一次事务
    fn with_retry<R>(
        &mut self,
        mut transaction: impl FnMut(&mut T, u8) -> Result<R, DriverError>,
    ) -> Result<R, DriverError> {
        let Self {
            transport,
            device_id,
            retry,
            sink,
            clock,
            ..
        } = self;
        let id = *device_id;
        retry.run(&**clock, &**sink, || transaction(&mut *transport, id))
    }

    /// 读取寄存器（按补码解码）
    pub fn read_register(&mut self, name: RegisterName) -> Result<i64, DriverError> {
        let register = name.register();
        self.with_retry(|transport, id| {
            let context = || format!("Read failed for {}", register.name);
            let raw = match register.width {
                RegisterWidth::U8 => {
                    let txrx = transport.read_u8(id, register.address);
                    check_response(&*transport, context, &txrx)?;
                    u32::from(txrx.value)
                },
                RegisterWidth::U16 => {
                    let txrx = transport.read_u16(id, register.address);
                    check_response(&*transport, context, &txrx)?;
                    u32::from(txrx.value)
                },
                RegisterWidth::U32 => {
                    let txrx = transport.read_u32(id, register.address);
                    check_response(&*transport, context, &txrx)?;
                    txrx.value
                },
            };
            Ok(register.decode(raw))
        })
    }

    /// 写寄存器（负值按补码编码）
    ///
    /// 值超出寄存器宽度时返回 `DriverError::Encoding`，不发起事务。
    pub fn write_register(&mut self, name: RegisterName, value: i64) -> Result<(), DriverError> {
        let register = name.register();
        let raw = register.encode(value)?;
        self.with_retry(|transport, id| {
            let context = || format!("Write failed for {}, {}", register.name, value);
            let txrx = match register.width {
                RegisterWidth::U8 => transport.write_u8(id, register.address, raw as u8),
                RegisterWidth::U16 => transport.write_u16(id, register.address, raw as u16),
                RegisterWidth::U32 => transport.write_u32(id, register.address, raw),
            };
            check_response(&*transport, context, &txrx)
        })
    }

    /// 按当前等待选项轮询
    fn wait_for(
        &mut self,
        operation: &'static str,
        mut condition: impl FnMut(&mut Self) -> Result<bool, DriverError>,
    ) -> Result<(), DriverError> {
        let options = self.wait.clone();
        let clock = Arc::clone(&self.clock);
        wait_until(&options, &*clock, operation, || condition(&mut *self))
    }

    // ==================== 力矩与模式 ====================

    /// 使能或失能力矩，并等待控制器完成切换
    ///
    /// 等待默认没有超时。
    pub fn set_torque(&mut self, on: bool) -> Result<(), DriverError> {
        let value = if on { TORQUE_ON } else { TORQUE_OFF };
        self.write_register(RegisterName::TorqueEnable, value)?;

        self.wait_for("torque transition", |actuator| {
            let state = actuator.read_register(RegisterName::ControllerState)?;
            Ok(!ControllerState::from_raw(state).is_torque_transition())
        })?;

        debug!(device_id = self.device_id, on, "Torque settled");
        Ok(())
    }

    /// 力矩是否使能
    pub fn torque_enabled(&mut self) -> Result<bool, DriverError> {
        Ok(self.read_register(RegisterName::TorqueEnable)? != TORQUE_OFF)
    }

    /// 当前工作模式
    pub fn operating_mode(&mut self) -> Result<OperatingMode, DriverError> {
        let raw = self.read_register(RegisterName::OperatingMode)?;
        OperatingMode::from_raw(raw).map_err(|_| DriverError::UnexpectedValue {
            register: RegisterName::OperatingMode.register().name,
            value: raw,
        })
    }

    /// 确保设备处于 `mode` 且力矩使能
    ///
    /// 模式不同时先失能力矩再写入模式（模式寄存器只能在力矩失能时写入）。
    /// 最后如果力矩未使能则使能。模式已正确且力矩已使能时不产生任何写事务。
    pub fn ensure_mode(&mut self, mode: OperatingMode) -> Result<(), DriverError> {
        let current = self.read_register(RegisterName::OperatingMode)?;
        if current != mode.code() {
            debug!(
                device_id = self.device_id,
                from = current,
                to = %mode,
                "Switching operating mode"
            );
            self.set_torque(false)?;
            self.write_register(RegisterName::OperatingMode, mode.code())?;
        }

        if self.read_register(RegisterName::TorqueEnable)? == TORQUE_OFF {
            self.set_torque(true)?;
        }
        Ok(())
    }

    // ==================== 运动指令 ====================

    /// 设置目标位置，返回实际下发的角度（度）
    ///
    /// - `degrees_per_second`：运动速度，`None` 或 0 时使用 VELOCITY_LIMIT 中的限速
    /// - `block`：为 `true` 时轮询 PRESENT_POSITION，直到**精确等于**目标脉冲数
    ///
    /// 非有限的 `degrees` 或 `degrees_per_second` 返回 `DriverError::InvalidArgument`，
    /// 不产生任何写事务。阻塞等待默认没有超时。
    pub fn set_position(
        &mut self,
        degrees: f64,
        degrees_per_second: Option<f64>,
        block: bool,
    ) -> Result<f64, DriverError> {
        ensure_finite("degrees", degrees)?;
        if let Some(dps) = degrees_per_second {
            ensure_finite("degrees_per_second", dps)?;
        }

        let profile_velocity = match degrees_per_second {
            Some(dps) if dps != 0.0 => dps_to_crpm(dps.abs()),
            _ => self.read_register(RegisterName::VelocityLimit)?,
        };
        self.write_register(RegisterName::ProfileVelocity, profile_velocity)?;

        self.ensure_mode(OperatingMode::Position)?;

        let goal = degrees_to_pulses(degrees);
        let realized = pulses_to_degrees(goal);
        self.write_register(RegisterName::GoalPosition, goal)?;
        debug!(
            device_id = self.device_id,
            goal_pulses = goal,
            realized_deg = realized,
            profile_velocity,
            "Goal position set"
        );

        if block {
            self.wait_for("position convergence", |actuator| {
                let present = actuator.read_register(RegisterName::PresentPosition)?;
                trace!(present_deg = pulses_to_degrees(present), "Position poll");
                Ok(present == goal)
            })?;
        }
        Ok(realized)
    }

    /// 设置目标速度，返回实际下发的速度（度/秒）
    ///
    /// `block` 为 `true` 时先读一次 PRESENT_VELOCITY 判断方向：目标高于当前值
    /// 时等待 `present >= goal`，否则等待 `present <= goal`。
    ///
    /// 非有限的速度返回 `DriverError::InvalidArgument`。阻塞等待默认没有超时。
    pub fn set_velocity(&mut self, degrees_per_second: f64, block: bool) -> Result<f64, DriverError> {
        ensure_finite("degrees_per_second", degrees_per_second)?;
        self.ensure_mode(OperatingMode::Velocity)?;

        let goal = dps_to_crpm(degrees_per_second);
        let realized = crpm_to_dps(goal);
        self.write_register(RegisterName::GoalVelocity, goal)?;
        debug!(
            device_id = self.device_id,
            goal_crpm = goal,
            realized_dps = realized,
            "Goal velocity set"
        );

        if block {
            let start = self.read_register(RegisterName::PresentVelocity)?;
            let accelerating = goal > start;
            self.wait_for("velocity convergence", |actuator| {
                let present = actuator.read_register(RegisterName::PresentVelocity)?;
                trace!(present_dps = crpm_to_dps(present), "Velocity poll");
                Ok(if accelerating {
                    present >= goal
                } else {
                    present <= goal
                })
            })?;
        }
        Ok(realized)
    }

    // ==================== 遥测 ====================

    /// 当前位置（度）
    pub fn position(&mut self) -> Result<f64, DriverError> {
        Ok(pulses_to_degrees(
            self.read_register(RegisterName::PresentPosition)?,
        ))
    }

    /// 当前速度（度/秒）
    pub fn velocity(&mut self) -> Result<f64, DriverError> {
        Ok(crpm_to_dps(self.read_register(RegisterName::PresentVelocity)?))
    }

    /// 当前电流（A）
    pub fn current(&mut self) -> Result<f64, DriverError> {
        Ok(raw_to_amperes(self.read_register(RegisterName::PresentCurrent)?))
    }

    /// 输入电压（V）
    pub fn voltage(&mut self) -> Result<f64, DriverError> {
        Ok(raw_to_volts(
            self.read_register(RegisterName::PresentInputVoltage)?,
        ))
    }

    /// 逆变器温度（℃）
    pub fn inverter_temperature(&mut self) -> Result<i64, DriverError> {
        Ok(raw_to_celsius(
            self.read_register(RegisterName::PresentInverterTemperature)?,
        ))
    }

    /// 电机温度（℃）
    pub fn motor_temperature(&mut self) -> Result<i64, DriverError> {
        Ok(raw_to_celsius(
            self.read_register(RegisterName::PresentMotorTemperature)?,
        ))
    }

    /// 依次读取全部遥测量
    pub fn read_telemetry(&mut self) -> Result<Telemetry, DriverError> {
        Ok(Telemetry {
            position_deg: self.position()?,
            velocity_dps: self.velocity()?,
            current_a: self.current()?,
            voltage_v: self.voltage()?,
            inverter_temperature_c: self.inverter_temperature()?,
            motor_temperature_c: self.motor_temperature()?,
        })
    }

    // ==================== 访问器 ====================

    pub fn port_name(&self) -> &str {
        self.transport.port_name()
    }

    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    /// 打开时 Ping 返回的型号
    pub fn model_number(&self) -> u16 {
        self.model_number
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn wait_options(&self) -> &WaitOptions {
        &self.wait
    }

    /// 替换等待选项（例如为一次长时间运动单独设置超时）
    pub fn set_wait_options(&mut self, options: WaitOptions) {
        self.wait = options;
    }
}

impl<T: Transport> fmt::Debug for Actuator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actuator")
            .field("port", &self.transport.port_name())
            .field("device_id", &self.device_id)
            .field("model_number", &self.model_number)
            .field("retry", &self.retry)
            .field("wait", &self.wait)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Drop for Actuator<T> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // 只写失能，不轮询控制器状态
        if let Err(e) = self.write_register(RegisterName::TorqueEnable, TORQUE_OFF) {
            warn!(
                port = %self.transport.port_name(),
                "Failed to disable torque on drop: {}",
                e
            );
        }
        self.close_transport();
    }
}
