//! 协议相关类型定义

use serde::Serialize;
use std::fmt;

/// 会话状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// 驱动最近一次请求的状态（CIP general status）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverStatus {
    pub code: u32,
    pub message: String,
}

impl DriverStatus {
    pub const SUCCESS: u32 = 0x00;
    pub const PATH_DESTINATION_UNKNOWN: u32 = 0x05;
    pub const SERVICE_NOT_SUPPORTED: u32 = 0x08;
    pub const ATTRIBUTE_NOT_SUPPORTED: u32 = 0x14;

    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn success() -> Self {
        Self::new(Self::SUCCESS, "success")
    }

    pub fn is_success(&self) -> bool {
        self.code == Self::SUCCESS
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:#04x}, {})", self.code, self.message)
    }
}
