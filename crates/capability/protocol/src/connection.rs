//! 单端点会话句柄
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let mut connection = ConnectionHandle::new("192.168.1.10", driver);
//! connection.connect()?;
//! let value = connection.execute(&AttributeRequest::read(path))?;
//! connection.disconnect()?;
//! ```

use crate::driver::CipDriver;
use crate::error::ProtocolError;
use crate::types::{ConnectionState, DriverStatus};
use domain::{AttributeRequest, AttributeValue, Operation};
use tracing::{debug, info, warn};

/// 独占一个驱动实例的会话句柄。
///
/// 句柄在创建时绑定 host，之后不可更换；`Drop` 时若仍处于 Connected 会关闭会话。
pub struct ConnectionHandle<D: CipDriver> {
    host: String,
    driver: D,
    state: ConnectionState,
}

impl<D: CipDriver> ConnectionHandle<D> {
    /// 创建句柄（不发起连接）。
    pub fn new(host: impl Into<String>, driver: D) -> Self {
        Self {
            host: host.into(),
            driver,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// 打开会话。已连接时不做任何事。
    pub fn connect(&mut self) -> Result<(), ProtocolError> {
        if self.is_connected() {
            return Ok(());
        }
        match self.driver.open(&self.host) {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                info!(target: "cip.protocol", host = %self.host, "session_opened");
                Ok(())
            }
            Err(err) => {
                self.state = ConnectionState::Disconnected;
                Err(ProtocolError::Connection(format!(
                    "unable to connect to {}: {}",
                    self.host, err
                )))
            }
        }
    }

    /// 关闭会话。未连接时直接返回 Ok；关闭失败时状态仍置为 Disconnected。
    pub fn disconnect(&mut self) -> Result<(), ProtocolError> {
        if !self.is_connected() {
            return Ok(());
        }
        self.state = ConnectionState::Disconnected;
        self.driver.close().map_err(|err| {
            ProtocolError::Connection(format!("unable to close session to {}: {}", self.host, err))
        })?;
        info!(target: "cip.protocol", host = %self.host, "session_closed");
        Ok(())
    }

    /// 丢弃当前会话并重新连接。
    ///
    /// 旧会话关闭失败只记录日志；重新连接失败时返回错误，句柄保持 Disconnected。
    pub fn reconnect(&mut self) -> Result<(), ProtocolError> {
        if let Err(err) = self.disconnect() {
            warn!(target: "cip.protocol", host = %self.host, error = %err, "session_close_failed");
        }
        self.connect()
    }

    /// 通过当前会话执行单属性请求。
    ///
    /// 读请求返回读到的值，写请求返回写入的字节。
    pub fn execute(&mut self, request: &AttributeRequest) -> Result<AttributeValue, ProtocolError> {
        if !self.is_connected() {
            return Err(ProtocolError::NotConnected(self.host.clone()));
        }
        let path = request.path.to_vec();
        debug!(
            target: "cip.protocol",
            host = %self.host,
            path = ?path,
            operation = request.operation.name(),
            "attribute_request"
        );
        match &request.operation {
            Operation::Read => self
                .driver
                .get_attribute_single(&path)?
                .ok_or(ProtocolError::Rejected {
                    operation: request.operation.name(),
                }),
            Operation::Write(value) => {
                if self.driver.set_attribute_single(value, &path)? {
                    Ok(AttributeValue::Bytes(value.clone()))
                } else {
                    Err(ProtocolError::Rejected {
                        operation: request.operation.name(),
                    })
                }
            }
        }
    }

    /// 查询驱动最近一次请求的状态。
    pub fn status(&self) -> Result<DriverStatus, ProtocolError> {
        Ok(self.driver.status()?)
    }
}

impl<D: CipDriver> Drop for ConnectionHandle<D> {
    fn drop(&mut self) {
        if let Err(err) = self.disconnect() {
            warn!(target: "cip.protocol", host = %self.host, error = %err, "session_close_failed");
        }
    }
}
