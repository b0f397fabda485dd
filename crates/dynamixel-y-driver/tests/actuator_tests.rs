//! 执行器驱动集成测试
//!
//! 使用 `MockTransport` / `MockDevice` 验证打开/关闭流程、力矩与模式状态机、
//! 位置/速度设定与阻塞收敛、遥测换算以及事务重试。

use dynamixel_y_driver::{
    Actuator, ActuatorBuilder, CancellationToken, DriverError, ManualClock, WaitOptions,
};
use dynamixel_y_protocol::{
    CommResult, ControllerState, ERRNUM_ACCESS, ERRNUM_DATA_RANGE, OperatingMode, RegisterName, TORQUE_ON,
    crpm_to_dps, degrees_to_pulses, dps_to_crpm, packet_error_text, pulses_to_degrees,
};
use dynamixel_y_transport::{MockDevice, MockFailure, MockTransport, SharedMockDevice};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

fn open_with(
    builder: &ActuatorBuilder,
    device: MockDevice,
) -> (Actuator<MockTransport>, SharedMockDevice) {
    let (transport, shared) = MockTransport::with_device("mock0", device);
    let actuator = builder.open(transport).expect("Failed to open actuator");
    (actuator, shared)
}

fn open(device: MockDevice) -> (Actuator<MockTransport>, SharedMockDevice) {
    open_with(&ActuatorBuilder::new(), device)
}

/// 收集重试诊断信息的 sink
fn collecting_sink() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Send + Sync + 'static) {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&messages);
    let sink = move |message: &str| captured.lock().unwrap().push(message.to_string());
    (messages, sink)
}

// ==================== 打开与关闭 ====================

#[test]
fn test_open_enables_torque_and_close_disables() {
    let (actuator, device) = open(MockDevice::new().with_model_number(4000));

    assert_eq!(actuator.model_number(), 4000);
    assert_eq!(actuator.port_name(), "mock0");
    assert_eq!(actuator.device_id(), 1);
    assert!(device.lock().torque_enabled());
    assert!(device.lock().is_port_open());

    actuator.close().unwrap();

    let device = device.lock();
    assert!(!device.torque_enabled());
    assert!(!device.is_port_open());
    assert_eq!(device.write_values(RegisterName::TorqueEnable), vec![1, 0]);
    assert_eq!(device.close_calls(), 1);
}

#[test]
fn test_open_port_failure_is_port_error() {
    let (transport, device) = MockTransport::with_device("mock0", MockDevice::new().failing_open());
    let err = ActuatorBuilder::new().open(transport).unwrap_err();

    assert!(matches!(err, DriverError::Port { ref port, .. } if port == "mock0"));
    assert_eq!(device.lock().close_calls(), 0);
}

#[test]
fn test_baud_rate_failure_closes_port() {
    let (transport, device) =
        MockTransport::with_device("mock0", MockDevice::new().failing_baud_rate());
    let err = ActuatorBuilder::new().open(transport).unwrap_err();

    assert!(matches!(err, DriverError::Port { .. }));
    let device = device.lock();
    assert!(!device.is_port_open());
    assert_eq!(device.close_calls(), 1);
}

#[test]
fn test_ping_failure_closes_port() {
    let (transport, device) = MockTransport::with_device("mock0", MockDevice::disconnected());
    let err = ActuatorBuilder::new().open(transport).unwrap_err();

    assert_eq!(
        err.to_string(),
        format!(
            "Ping failed for mock0 at 1000000 baud. {}",
            CommResult::RxTimeout.text()
        )
    );
    let device = device.lock();
    assert!(!device.is_port_open());
    assert_eq!(device.total_writes(), 0);
}

#[test]
fn test_ping_uses_configured_id_and_baud() {
    let builder = ActuatorBuilder::new().device_id(3).baud_rate(57_600);

    let (transport, _) = MockTransport::with_device("mock0", MockDevice::new());
    let err = builder.open(transport).unwrap_err();
    assert!(err.to_string().starts_with("Ping failed for mock0 at 57600 baud"));

    let (actuator, _) = open_with(&builder, MockDevice::new().with_id(3));
    assert_eq!(actuator.device_id(), 3);
    actuator.close().unwrap();
}

#[test]
fn test_torque_enable_failure_during_open_closes_port() {
    let mut device = MockDevice::new();
    device.set_persistent_failure(Some(MockFailure::Device(ERRNUM_ACCESS)));
    let (transport, device) = MockTransport::with_device("mock0", device);

    let err = ActuatorBuilder::new()
        .retry_budget(Duration::ZERO)
        .open(transport)
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        format!(
            "Write failed for TORQUE_ENABLE, 1. {}",
            packet_error_text(ERRNUM_ACCESS)
        )
    );
    let device = device.lock();
    assert!(!device.is_port_open());
    assert_eq!(device.close_calls(), 1);
}

#[test]
fn test_drop_disables_torque_and_closes_port() {
    let (actuator, device) = open(MockDevice::new());
    drop(actuator);

    let device = device.lock();
    assert!(!device.torque_enabled());
    assert!(!device.is_port_open());
    assert_eq!(device.close_calls(), 1);
}

#[test]
fn test_drop_does_not_wait_for_controller_state() {
    let (actuator, device) = open(MockDevice::new());
    // 控制器一直停在“正在失能”状态
    device
        .lock()
        .set_register(RegisterName::ControllerState, ControllerState::PROCESSING_TORQUE_OFF);

    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        drop(actuator);
        let _ = done_tx.send(());
    });
    assert!(done_rx.recv_timeout(Duration::from_secs(2)).is_ok());

    let device = device.lock();
    assert!(!device.torque_enabled());
    assert!(!device.is_port_open());
    assert_eq!(device.write_values(RegisterName::TorqueEnable), vec![1, 0]);
    assert_eq!(device.close_calls(), 1);
}

#[test]
fn test_drop_closes_port_when_torque_write_fails() {
    let (actuator, device) = open_with(
        &ActuatorBuilder::new().retry_budget(Duration::ZERO),
        MockDevice::new(),
    );
    device
        .lock()
        .set_persistent_failure(Some(MockFailure::Comm(CommResult::RxTimeout)));

    drop(actuator);

    let device = device.lock();
    assert!(!device.is_port_open());
    assert_eq!(device.close_calls(), 1);
}

#[test]
fn test_close_closes_port_even_when_torque_disable_fails() {
    let (actuator, device) = open_with(
        &ActuatorBuilder::new().retry_budget(Duration::ZERO),
        MockDevice::new(),
    );
    device
        .lock()
        .set_persistent_failure(Some(MockFailure::Comm(CommResult::RxTimeout)));

    let err = actuator.close().unwrap_err();

    assert!(err.to_string().starts_with("Write failed for TORQUE_ENABLE, 0"));
    let device = device.lock();
    assert!(!device.is_port_open());
    assert_eq!(device.close_calls(), 1);
}

// ==================== 力矩与模式 ====================

#[test]
fn test_torque_waits_for_controller_state() {
    let (mut actuator, device) = open(MockDevice::new().with_torque_settle_reads(3));
    device.lock().clear_log();

    actuator.set_torque(false).unwrap();

    let device_guard = device.lock();
    // 3 次忙状态 + 1 次空闲
    assert_eq!(device_guard.reads_of(RegisterName::ControllerState), 4);
    assert!(!device_guard.torque_enabled());
    drop(device_guard);

    assert!(!actuator.torque_enabled().unwrap());
}

#[test]
fn test_unknown_operating_mode_is_unexpected_value() {
    let (mut actuator, _device) =
        open(MockDevice::new().with_register(RegisterName::OperatingMode, 2));

    let err = actuator.operating_mode().unwrap_err();

    assert!(matches!(
        err,
        DriverError::UnexpectedValue {
            register: "OPERATING_MODE",
            value: 2
        }
    ));
    assert!(!err.is_retryable());
}

#[test]
fn test_ensure_mode_same_mode_no_writes() {
    let (mut actuator, device) = open(MockDevice::new());
    device.lock().clear_log();

    actuator.ensure_mode(OperatingMode::Position).unwrap();

    assert_eq!(device.lock().total_writes(), 0);
}

#[test]
fn test_ensure_mode_switch_sequence() {
    let (mut actuator, device) = open(MockDevice::new());
    device.lock().clear_log();

    actuator.ensure_mode(OperatingMode::Velocity).unwrap();

    {
        let device = device.lock();
        assert_eq!(device.write_values(RegisterName::TorqueEnable), vec![0, 1]);
        assert_eq!(
            device.write_values(RegisterName::OperatingMode),
            vec![OperatingMode::Velocity.code()]
        );
        assert_eq!(device.total_writes(), 3);
        assert!(device.torque_enabled());
    }
    assert_eq!(actuator.operating_mode().unwrap(), OperatingMode::Velocity);
}

#[test]
fn test_ensure_mode_reenables_torque() {
    let (mut actuator, device) = open(MockDevice::new());
    actuator.set_torque(false).unwrap();
    device.lock().clear_log();

    actuator.ensure_mode(OperatingMode::Position).unwrap();

    let device = device.lock();
    assert_eq!(device.write_values(RegisterName::TorqueEnable), vec![TORQUE_ON]);
    assert_eq!(device.writes_to(RegisterName::OperatingMode), 0);
}

// ==================== 位置 ====================

#[test]
fn test_set_position_blocking_converges_exactly() {
    let (mut actuator, device) = open(MockDevice::new().with_position_step(1000));
    device.lock().clear_log();

    let goal = degrees_to_pulses(90.0001);
    let realized = actuator.set_position(90.0001, None, true).unwrap();

    assert_eq!(realized, pulses_to_degrees(goal));
    let device = device.lock();
    assert_eq!(device.register(RegisterName::PresentPosition), goal);
    // 每次读取前进 1000 脉冲，最后一次读取才精确等于目标
    assert_eq!(
        device.reads_of(RegisterName::PresentPosition) as i64,
        (goal + 999) / 1000
    );
    assert_eq!(device.write_values(RegisterName::GoalPosition), vec![goal]);
}

#[test]
fn test_set_position_non_blocking_does_not_poll() {
    let (mut actuator, device) = open(MockDevice::new());
    device.lock().clear_log();

    let realized = actuator.set_position(-45.0, Some(90.0), false).unwrap();

    assert_eq!(realized, pulses_to_degrees(-65_536));
    let device = device.lock();
    assert_eq!(device.reads_of(RegisterName::PresentPosition), 0);
    assert_eq!(device.write_values(RegisterName::GoalPosition), vec![-65_536]);
}

#[test]
fn test_profile_velocity_selection() {
    let (mut actuator, device) = open(
        MockDevice::new().with_register(RegisterName::VelocityLimit, 2500),
    );

    actuator.set_position(10.0, None, false).unwrap();
    actuator.set_position(20.0, Some(0.0), false).unwrap();
    actuator.set_position(30.0, Some(90.0), false).unwrap();
    actuator.set_position(40.0, Some(-90.0), false).unwrap();

    assert_eq!(
        device.lock().write_values(RegisterName::ProfileVelocity),
        vec![2500, 2500, dps_to_crpm(90.0), dps_to_crpm(90.0)]
    );
}

#[test]
fn test_non_finite_motion_arguments_are_rejected() {
    let (mut actuator, device) = open(MockDevice::new());
    device.lock().clear_log();

    let err = actuator.set_position(10.0, Some(f64::NAN), false).unwrap_err();
    assert!(matches!(
        err,
        DriverError::InvalidArgument {
            name: "degrees_per_second",
            ..
        }
    ));

    let err = actuator.set_position(f64::INFINITY, None, false).unwrap_err();
    assert!(matches!(err, DriverError::InvalidArgument { name: "degrees", .. }));

    let err = actuator.set_velocity(f64::NEG_INFINITY, false).unwrap_err();
    assert!(matches!(
        err,
        DriverError::InvalidArgument {
            name: "degrees_per_second",
            ..
        }
    ));

    assert_eq!(device.lock().total_writes(), 0);
}

#[test]
fn test_set_position_switches_from_velocity_mode() {
    let (mut actuator, device) = open(
        MockDevice::new().with_register(RegisterName::OperatingMode, OperatingMode::Velocity.code()),
    );

    actuator.set_position(5.0, None, true).unwrap();

    assert_eq!(actuator.operating_mode().unwrap(), OperatingMode::Position);
    assert!(device.lock().torque_enabled());
}

#[test]
fn test_position_wait_timeout() {
    let builder = ActuatorBuilder::new()
        .clock(Arc::new(ManualClock::with_auto_advance(Duration::from_millis(1))))
        .wait_timeout(Duration::from_millis(50));
    let (mut actuator, device) = open_with(&builder, MockDevice::new().with_position_offset(5));

    let err = actuator.set_position(10.0, None, true).unwrap_err();

    assert!(matches!(
        err,
        DriverError::Timeout {
            operation: "position convergence",
            timeout_ms: 50
        }
    ));
    assert_eq!(
        device.lock().register(RegisterName::PresentPosition),
        degrees_to_pulses(10.0) + 5
    );
    actuator.close().unwrap();
}

// ==================== 速度 ====================

#[test]
fn test_set_velocity_non_blocking() {
    let (mut actuator, device) = open(MockDevice::new());
    device.lock().clear_log();

    let realized = actuator.set_velocity(180.0, false).unwrap();

    assert_eq!(realized, crpm_to_dps(dps_to_crpm(180.0)));
    let device = device.lock();
    assert_eq!(device.write_values(RegisterName::GoalVelocity), vec![3000]);
    assert_eq!(device.reads_of(RegisterName::PresentVelocity), 0);
}

#[test]
fn test_set_velocity_blocking_accelerating() {
    let (mut actuator, device) = open(MockDevice::new().with_velocity_step(100));
    device.lock().clear_log();

    actuator.set_velocity(180.0, true).unwrap();

    let device = device.lock();
    // 预读 100，之后 200..=3000
    assert_eq!(device.reads_of(RegisterName::PresentVelocity), 30);
    assert_eq!(device.register(RegisterName::PresentVelocity), 3000);
}

#[test]
fn test_set_velocity_blocking_decelerating() {
    let (mut actuator, device) = open(MockDevice::new().with_velocity_step(100));
    actuator.set_velocity(180.0, true).unwrap();
    device.lock().clear_log();

    let realized = actuator.set_velocity(-90.0, true).unwrap();

    assert_eq!(realized, crpm_to_dps(-1500));
    let device = device.lock();
    // 预读 2900，之后 2800 ..= -1500
    assert_eq!(device.reads_of(RegisterName::PresentVelocity), 45);
    assert_eq!(device.register(RegisterName::PresentVelocity), -1500);
}

#[test]
fn test_velocity_wait_cancelled() {
    let token = CancellationToken::new();
    let builder = ActuatorBuilder::new().cancellation_token(token.clone());
    let (mut actuator, _device) = open_with(
        &builder,
        MockDevice::new()
            .with_velocity_step(10)
            .with_register(RegisterName::OperatingMode, OperatingMode::Velocity.code()),
    );

    token.cancel();
    let err = actuator.set_velocity(180.0, true).unwrap_err();
    assert!(matches!(
        err,
        DriverError::Cancelled {
            operation: "velocity convergence"
        }
    ));

    token.reset();
    actuator.close().unwrap();
}

#[test]
fn test_set_wait_options_per_motion() {
    let (mut actuator, _device) = open(MockDevice::new().with_position_offset(1));
    let token = CancellationToken::new();
    token.cancel();
    actuator.set_wait_options(WaitOptions::new().with_cancellation(token.clone()));

    let err = actuator.set_position(1.0, None, true).unwrap_err();
    assert!(matches!(err, DriverError::Cancelled { .. }));

    actuator.set_wait_options(WaitOptions::default());
    assert!(actuator.wait_options().cancel.is_none());
    actuator.close().unwrap();
}

// ==================== 遥测 ====================

#[test]
fn test_telemetry_conversions() {
    let (mut actuator, _device) = open(
        MockDevice::new()
            .with_register(RegisterName::GoalPosition, 131_072)
            .with_register(RegisterName::PresentPosition, 131_072)
            .with_register(RegisterName::PresentVelocity, -3000)
            .with_register(RegisterName::PresentCurrent, -25)
            .with_register(RegisterName::PresentInputVoltage, 240)
            .with_register(RegisterName::PresentInverterTemperature, 41)
            .with_register(RegisterName::PresentMotorTemperature, -5),
    );

    assert!((actuator.position().unwrap() - 90.0).abs() < 1e-9);
    assert!((actuator.velocity().unwrap() + 180.0).abs() < 1e-9);
    assert!((actuator.current().unwrap() + 0.25).abs() < 1e-12);
    assert!((actuator.voltage().unwrap() - 24.0).abs() < 1e-12);
    assert_eq!(actuator.inverter_temperature().unwrap(), 41);
    // 1 字节寄存器按补码解码
    assert_eq!(actuator.motor_temperature().unwrap(), -5);

    let telemetry = actuator.read_telemetry().unwrap();
    assert_eq!(
        telemetry.to_string(),
        "90.000 deg, -180.000 deg/s, -0.25 A, 24.0 V, 41 degC, -5 degC"
    );

}

#[cfg(feature = "serde-telemetry")]
#[test]
fn test_telemetry_serializes() {
    let (mut actuator, _device) = open(
        MockDevice::new().with_register(RegisterName::PresentMotorTemperature, -5),
    );

    let json = serde_json::to_value(actuator.read_telemetry().unwrap()).unwrap();
    assert_eq!(json["voltage_v"], 24.0);
    assert_eq!(json["motor_temperature_c"], -5);
}

// ==================== 重试 ====================

#[test]
fn test_transient_failures_are_retried() {
    let (messages, sink) = collecting_sink();
    let (mut actuator, device) =
        open_with(&ActuatorBuilder::new().diagnostic_sink(sink), MockDevice::new());

    device
        .lock()
        .push_failures(MockFailure::Comm(CommResult::RxCorrupt), 2);

    assert!((actuator.voltage().unwrap() - 24.0).abs() < 1e-12);

    let messages = messages.lock().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(
        messages[0],
        format!(
            "Read failed for PRESENT_INPUT_VOLTAGE. {}",
            CommResult::RxCorrupt.text()
        )
    );
}

#[test]
fn test_retry_budget_exhausted_propagates_last_failure() {
    let (messages, sink) = collecting_sink();
    let builder = ActuatorBuilder::new()
        .diagnostic_sink(sink)
        .clock(Arc::new(ManualClock::with_auto_advance(Duration::from_millis(300))));
    let (mut actuator, device) = open_with(&builder, MockDevice::new());

    device
        .lock()
        .set_persistent_failure(Some(MockFailure::Device(ERRNUM_DATA_RANGE)));

    let err = actuator.current().unwrap_err();

    assert_eq!(
        err.to_string(),
        format!(
            "Read failed for PRESENT_CURRENT. {}",
            packet_error_text(ERRNUM_DATA_RANGE)
        )
    );
    assert_eq!(device.lock().reads_of(RegisterName::PresentCurrent), 4);
    assert_eq!(messages.lock().unwrap().len(), 3);

    device.lock().set_persistent_failure(None);
    actuator.close().unwrap();
}

#[test]
fn test_out_of_range_write_is_not_sent() {
    let (mut actuator, device) = open(MockDevice::new());
    device.lock().clear_log();

    let err = actuator
        .write_register(RegisterName::TorqueEnable, 300)
        .unwrap_err();

    assert!(matches!(err, DriverError::Encoding(_)));
    assert_eq!(device.lock().total_writes(), 0);
}

#[test]
fn test_negative_register_roundtrip_through_driver() {
    let (mut actuator, device) = open(MockDevice::new());

    actuator
        .write_register(RegisterName::GoalVelocity, -1234)
        .unwrap();

    assert_eq!(actuator.read_register(RegisterName::GoalVelocity).unwrap(), -1234);
    assert_eq!(device.lock().register(RegisterName::GoalVelocity), -1234);
}
