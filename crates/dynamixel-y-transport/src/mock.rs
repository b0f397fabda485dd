//! Mock 传输层
//!
//! 用于测试的模拟串口与执行器。`MockDevice` 保存寄存器内存、
//! 端口状态和事务日志，通过 `Arc<Mutex<_>>` 与 `MockTransport` 共享，
//! 测试可以在驱动关闭端口之后继续检查设备状态。
//!
//! 模拟行为：
//! - 写 TORQUE_ENABLE 后，接下来若干次读 CONTROLLER_STATE 返回忙状态
//! - 读 PRESENT_POSITION / PRESENT_VELOCITY 时，当前值按步长逼近目标值
//! - 力矩使能时写 OPERATING_MODE 返回访问错误（与真实设备一致）
//! - 可脚本化注入通信失败或设备错误

use crate::{Transport, TransportError, TxRx};
use dynamixel_y_protocol::registers::{
    CONTROLLER_STATE, GOAL_POSITION, GOAL_VELOCITY, OPERATING_MODE, PRESENT_POSITION,
    PRESENT_VELOCITY, TORQUE_ENABLE,
};
use dynamixel_y_protocol::{
    CommResult, ControllerState, DEFAULT_BAUD_RATE, DEFAULT_DEVICE_ID, ERRNUM_ACCESS,
    OperatingMode, Register, RegisterName, RegisterWidth, TORQUE_OFF,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::trace;

/// 共享的模拟设备
pub type SharedMockDevice = Arc<Mutex<MockDevice>>;

/// 注入的事务失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// 通信失败（如 RxTimeout）
    Comm(CommResult),
    /// 设备返回错误字节
    Device(u8),
}

impl MockFailure {
    fn into_txrx<T>(self, value: T) -> TxRx<T> {
        match self {
            MockFailure::Comm(result) => TxRx::comm_failure(value, result),
            MockFailure::Device(error) => TxRx::device_error(value, error),
        }
    }
}

/// 事务日志条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockTransaction {
    Ping { id: u8 },
    Read { address: u16 },
    Write { address: u16, value: u32 },
}

/// 模拟执行器（含所在串口的状态）
#[derive(Debug)]
pub struct MockDevice {
    id: u8,
    model_number: u16,
    connected: bool,
    registers: HashMap<u16, u32>,
    failures: VecDeque<MockFailure>,
    persistent_failure: Option<MockFailure>,
    torque_settle_reads: u32,
    pending_settle: u32,
    position_step: i64,
    position_offset: i64,
    velocity_step: i64,
    port_open: bool,
    fail_open: bool,
    fail_baud: bool,
    open_calls: usize,
    close_calls: usize,
    log: Vec<MockTransaction>,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    /// 创建一个在线、位置模式、力矩失能的设备
    pub fn new() -> Self {
        let mut device = Self {
            id: DEFAULT_DEVICE_ID,
            model_number: 0,
            connected: true,
            registers: HashMap::new(),
            failures: VecDeque::new(),
            persistent_failure: None,
            torque_settle_reads: 2,
            pending_settle: 0,
            position_step: 0,
            position_offset: 0,
            velocity_step: 0,
            port_open: false,
            fail_open: false,
            fail_baud: false,
            open_calls: 0,
            close_calls: 0,
            log: Vec::new(),
        };

        device.set_register(RegisterName::OperatingMode, OperatingMode::Position.code());
        device.set_register(RegisterName::VelocityLimit, 3000);
        device.set_register(RegisterName::PresentInputVoltage, 240);
        device.set_register(RegisterName::PresentInverterTemperature, 35);
        device.set_register(RegisterName::PresentMotorTemperature, 33);
        device
    }

    /// 端口上没有设备（Ping 超时）
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::new()
        }
    }

    pub fn with_id(mut self, id: u8) -> Self {
        self.id = id;
        self
    }

    pub fn with_model_number(mut self, model_number: u16) -> Self {
        self.model_number = model_number;
        self
    }

    /// 每次写 TORQUE_ENABLE 后，CONTROLLER_STATE 保持忙状态的读取次数
    pub fn with_torque_settle_reads(mut self, reads: u32) -> Self {
        self.torque_settle_reads = reads;
        self
    }

    /// 每次读 PRESENT_POSITION 时前进的脉冲数（0 表示立即到达）
    pub fn with_position_step(mut self, pulses: i64) -> Self {
        self.position_step = pulses;
        self
    }

    /// 位置最终停在 `goal + offset`（用于模拟永远无法精确到达）
    pub fn with_position_offset(mut self, pulses: i64) -> Self {
        self.position_offset = pulses;
        self
    }

    /// 每次读 PRESENT_VELOCITY 时变化的 CRPM（0 表示立即到达）
    pub fn with_velocity_step(mut self, crpm: i64) -> Self {
        self.velocity_step = crpm;
        self
    }

    pub fn with_register(mut self, name: RegisterName, value: i64) -> Self {
        self.set_register(name, value);
        self
    }

    /// 打开端口失败
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// 设置波特率失败
    pub fn failing_baud_rate(mut self) -> Self {
        self.fail_baud = true;
        self
    }

    pub fn into_shared(self) -> SharedMockDevice {
        Arc::new(Mutex::new(self))
    }

    // ==================== 检查与操作 ====================

    /// 读取寄存器（按补码解码）
    pub fn register(&self, name: RegisterName) -> i64 {
        let register = name.register();
        register.decode(self.raw(register.address))
    }

    /// 直接设置寄存器（不经过事务，不记录日志）
    pub fn set_register(&mut self, name: RegisterName, value: i64) {
        self.store(name.register(), value);
    }

    pub fn torque_enabled(&self) -> bool {
        self.register(RegisterName::TorqueEnable) != TORQUE_OFF
    }

    pub fn operating_mode(&self) -> Option<OperatingMode> {
        OperatingMode::from_raw(self.register(RegisterName::OperatingMode)).ok()
    }

    /// 对某寄存器成功或失败的写事务次数
    pub fn writes_to(&self, name: RegisterName) -> usize {
        self.write_values(name).len()
    }

    /// 对某寄存器写入的值（按补码解码）
    pub fn write_values(&self, name: RegisterName) -> Vec<i64> {
        let register = name.register();
        self.log
            .iter()
            .filter_map(|transaction| match *transaction {
                MockTransaction::Write { address, value } if address == register.address => {
                    Some(register.decode(value))
                },
                _ => None,
            })
            .collect()
    }

    /// 对某寄存器的读事务次数
    pub fn reads_of(&self, name: RegisterName) -> usize {
        let address = name.register().address;
        self.log
            .iter()
            .filter(|transaction| {
                matches!(transaction, MockTransaction::Read { address: a } if *a == address)
            })
            .count()
    }

    /// 写事务总数
    pub fn total_writes(&self) -> usize {
        self.log
            .iter()
            .filter(|transaction| matches!(transaction, MockTransaction::Write { .. }))
            .count()
    }

    pub fn transactions(&self) -> &[MockTransaction] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// 接下来 `count` 次读/写事务返回 `failure`
    pub fn push_failures(&mut self, failure: MockFailure, count: usize) {
        self.failures.extend(std::iter::repeat_n(failure, count));
    }

    /// 脚本队列为空后，所有读/写事务都返回 `failure`
    pub fn set_persistent_failure(&mut self, failure: Option<MockFailure>) {
        self.persistent_failure = failure;
    }

    pub fn is_port_open(&self) -> bool {
        self.port_open
    }

    pub fn open_calls(&self) -> usize {
        self.open_calls
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls
    }

    // ==================== 内部实现 ====================

    fn raw(&self, address: u16) -> u32 {
        self.registers.get(&address).copied().unwrap_or(0)
    }

    fn store(&mut self, register: Register, value: i64) {
        let mask = match register.width {
            RegisterWidth::U8 => 0xFF,
            RegisterWidth::U16 => 0xFFFF,
            RegisterWidth::U32 => u32::MAX,
        };
        self.registers.insert(register.address, value as u32 & mask);
    }

    fn value(&self, register: Register) -> i64 {
        register.decode(self.raw(register.address))
    }

    fn link_failure(&self, id: u8) -> Option<CommResult> {
        if !self.port_open {
            Some(CommResult::TxFail)
        } else if !self.connected || id != self.id {
            Some(CommResult::RxTimeout)
        } else {
            None
        }
    }

    fn next_failure(&mut self) -> Option<MockFailure> {
        self.failures.pop_front().or(self.persistent_failure)
    }

    fn ping(&mut self, id: u8) -> TxRx<u16> {
        self.log.push(MockTransaction::Ping { id });
        match self.link_failure(id) {
            Some(result) => TxRx::comm_failure(0, result),
            None => TxRx::success(self.model_number),
        }
    }

    fn read(&mut self, id: u8, address: u16) -> TxRx<u32> {
        self.log.push(MockTransaction::Read { address });

        if let Some(result) = self.link_failure(id) {
            return TxRx::comm_failure(0, result);
        }
        if let Some(failure) = self.next_failure() {
            trace!(address, ?failure, "Mock read failure injected");
            return failure.into_txrx(0);
        }

        let value = match address {
            a if a == CONTROLLER_STATE.address => self.controller_state(),
            a if a == PRESENT_POSITION.address => self.step_present(
                PRESENT_POSITION,
                GOAL_POSITION,
                OperatingMode::Position,
                self.position_step,
                self.position_offset,
            ),
            a if a == PRESENT_VELOCITY.address => self.step_present(
                PRESENT_VELOCITY,
                GOAL_VELOCITY,
                OperatingMode::Velocity,
                self.velocity_step,
                0,
            ),
            _ => self.raw(address),
        };
        TxRx::success(value)
    }

    fn write(&mut self, id: u8, address: u16, value: u32) -> TxRx<()> {
        self.log.push(MockTransaction::Write { address, value });

        if let Some(result) = self.link_failure(id) {
            return TxRx::comm_failure((), result);
        }
        if let Some(failure) = self.next_failure() {
            trace!(address, ?failure, "Mock write failure injected");
            return failure.into_txrx(());
        }

        // EEPROM 区只能在力矩失能时写入
        if address == OPERATING_MODE.address && self.torque_enabled() {
            return TxRx::device_error((), ERRNUM_ACCESS);
        }

        self.registers.insert(address, value);
        if address == TORQUE_ENABLE.address {
            self.pending_settle = self.torque_settle_reads;
        }
        TxRx::success(())
    }

    fn controller_state(&mut self) -> u32 {
        if self.pending_settle == 0 {
            return self.raw(CONTROLLER_STATE.address);
        }

        self.pending_settle -= 1;
        let busy = if self.torque_enabled() {
            ControllerState::PROCESSING_TORQUE_ON
        } else {
            ControllerState::PROCESSING_TORQUE_OFF
        };
        busy as u32
    }

    fn step_present(
        &mut self,
        present: Register,
        goal: Register,
        mode: OperatingMode,
        step: i64,
        offset: i64,
    ) -> u32 {
        if self.torque_enabled() && self.operating_mode() == Some(mode) {
            let current = self.value(present);
            let target = self.value(goal) + offset;
            let next = if step <= 0 {
                target
            } else if current < target {
                (current + step).min(target)
            } else {
                (current - step).max(target)
            };
            self.store(present, next);
        }
        self.raw(present.address)
    }
}

/// 连接到 `MockDevice` 的传输层
#[derive(Debug, Clone)]
pub struct MockTransport {
    port_name: String,
    baud_rate: u32,
    device: SharedMockDevice,
}

impl MockTransport {
    pub fn new(port_name: impl Into<String>, device: SharedMockDevice) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            device,
        }
    }

    /// 创建传输层并返回共享设备句柄
    pub fn with_device(port_name: impl Into<String>, device: MockDevice) -> (Self, SharedMockDevice) {
        let device = device.into_shared();
        (Self::new(port_name, device.clone()), device)
    }

    pub fn device(&self) -> &SharedMockDevice {
        &self.device
    }
}

impl Transport for MockTransport {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn open_port(&mut self) -> Result<(), TransportError> {
        let mut device = self.device.lock();
        device.open_calls += 1;
        if device.fail_open {
            return Err(TransportError::OpenFailed {
                port: self.port_name.clone(),
            });
        }
        device.port_open = true;
        Ok(())
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), TransportError> {
        if self.device.lock().fail_baud {
            return Err(TransportError::BaudRateRejected {
                port: self.port_name.clone(),
                baud_rate,
            });
        }
        self.baud_rate = baud_rate;
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn close_port(&mut self) {
        let mut device = self.device.lock();
        device.port_open = false;
        device.close_calls += 1;
    }

    fn ping(&mut self, id: u8) -> TxRx<u16> {
        self.device.lock().ping(id)
    }

    fn read_u8(&mut self, id: u8, address: u16) -> TxRx<u8> {
        self.device.lock().read(id, address).map(|value| value as u8)
    }

    fn read_u16(&mut self, id: u8, address: u16) -> TxRx<u16> {
        self.device.lock().read(id, address).map(|value| value as u16)
    }

    fn read_u32(&mut self, id: u8, address: u16) -> TxRx<u32> {
        self.device.lock().read(id, address)
    }

    fn write_u8(&mut self, id: u8, address: u16, value: u8) -> TxRx<()> {
        self.device.lock().write(id, address, u32::from(value))
    }

    fn write_u16(&mut self, id: u8, address: u16, value: u16) -> TxRx<()> {
        self.device.lock().write(id, address, u32::from(value))
    }

    fn write_u32(&mut self, id: u8, address: u16, value: u32) -> TxRx<()> {
        self.device.lock().write(id, address, value)
    }
}
