//! 协议错误类型定义

/// 驱动层错误（驱动调用抛出的异常）。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DriverError {
    message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// 会话与请求错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// 建立或关闭会话失败
    #[error("connection error: {0}")]
    Connection(String),

    /// 会话未建立
    #[error("not connected to {0}")]
    NotConnected(String),

    /// 请求过程中驱动抛出异常，视为会话已不可用
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    /// 驱动返回失败（None/false），会话仍可用
    #[error("{operation} rejected by device")]
    Rejected { operation: &'static str },
}

impl ProtocolError {
    /// 是否为连接级失败（需要重置会话）。
    pub fn is_connection_level(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}
