//! 执行器配置
//!
//! 所有字段都有默认值，TOML 文件中只需写出需要修改的部分：
//!
//! ```toml
//! device_id = 1
//! baud_rate = 1000000
//! retry_budget_ms = 1000
//!
//! [wait]
//! timeout_ms = 5000
//! poll_interval_us = 500
//! ```

use crate::error::DriverError;
use crate::retry::RetryPolicy;
use crate::wait::WaitOptions;
use dynamixel_y_protocol::{DEFAULT_BAUD_RATE, DEFAULT_DEVICE_ID};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 执行器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    /// 设备 ID
    pub device_id: u8,
    /// 串口波特率
    pub baud_rate: u32,
    /// 单次事务的重试预算（毫秒）
    pub retry_budget_ms: u64,
    /// 阻塞等待配置
    pub wait: WaitConfig,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            device_id: DEFAULT_DEVICE_ID,
            baud_rate: DEFAULT_BAUD_RATE,
            retry_budget_ms: RetryPolicy::DEFAULT_BUDGET.as_millis() as u64,
            wait: WaitConfig::default(),
        }
    }
}

/// 阻塞等待配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// 等待超时（毫秒），缺省为无限等待
    pub timeout_ms: Option<u64>,
    /// 轮询间隔（微秒），0 表示忙轮询
    pub poll_interval_us: u64,
}

impl ActuatorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, DriverError> {
        toml::from_str(content).map_err(|e| DriverError::Config(e.to_string()))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, DriverError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DriverError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, DriverError> {
        toml::to_string(self).map_err(|e| DriverError::Config(e.to_string()))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(self.retry_budget_ms))
    }

    /// 转换为等待选项（不含取消令牌）
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout: self.wait.timeout_ms.map(Duration::from_millis),
            poll_interval: Duration::from_micros(self.wait.poll_interval_us),
            cancel: None,
        }
    }
}
