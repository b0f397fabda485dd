//! 总线扫描
//!
//! 依次尝试每个串口：打开执行器后立即关闭，第一个成功的端口即为结果。

use crate::actuator::Actuator;
use crate::builder::ActuatorBuilder;
use crate::error::DriverError;
use dynamixel_y_transport::{PortEnumerator, Transport};
use tracing::{debug, info};

/// 在 `enumerator` 列出的端口中查找执行器
///
/// `connect` 为端口名创建传输层。任何端口上的失败都会被吞掉并继续尝试下一个；
/// 全部失败时返回 `DriverError::NotFound`。
pub fn scan<E, T, F>(
    enumerator: &E,
    builder: &ActuatorBuilder,
    mut connect: F,
) -> Result<String, DriverError>
where
    E: PortEnumerator + ?Sized,
    T: Transport,
    F: FnMut(&str) -> T,
{
    let ports = enumerator.port_names()?;

    for port in &ports {
        match builder.open(connect(port)).and_then(Actuator::close) {
            Ok(()) => {
                info!(port = %port, "DYNAMIXEL-Y found");
                return Ok(port.clone());
            },
            Err(e) => {
                debug!(port = %port, "No DYNAMIXEL-Y: {}", e);
            },
        }
    }

    Err(DriverError::NotFound { ports })
}

/// 在本机全部串口中查找执行器
#[cfg(feature = "serial")]
pub fn scan_serial_ports<T, F>(builder: &ActuatorBuilder, connect: F) -> Result<String, DriverError>
where
    T: Transport,
    F: FnMut(&str) -> T,
{
    scan(
        &dynamixel_y_transport::SerialPortEnumerator::new(),
        builder,
        connect,
    )
}
