//! 系统串口枚举
//!
//! 基于 `serialport::available_ports()`，用于总线扫描。

use crate::{PortEnumerator, TransportError};
use tracing::debug;

/// 枚举本机全部串口
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPortEnumerator;

impl SerialPortEnumerator {
    pub fn new() -> Self {
        Self
    }
}

impl PortEnumerator for SerialPortEnumerator {
    fn port_names(&self) -> Result<Vec<String>, TransportError> {
        let ports: Vec<String> = serialport::available_ports()?
            .into_iter()
            .map(|info| info.port_name)
            .collect();

        debug!(count = ports.len(), ?ports, "Enumerated serial ports");
        Ok(ports)
    }
}
