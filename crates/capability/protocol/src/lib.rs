//! # CIP 会话能力模块
//!
//! 对单个 CIP 端点的会话管理：
//! - **CipDriver**：协议驱动抽象（open/close/get/set/status），编码细节由驱动实现负责
//! - **ConnectionHandle**：独占一个驱动实例，维护 Connected/Disconnected 状态
//! - **LoopbackDriver**：内存设备，用于本地联调
//!
//! ## 架构设计
//!
//! ```text
//! AttributeProcessor
//!       │
//!       ▼
//! RetryExecutor ── reconnect hook ──┐
//!       │                           │
//!       ▼                           ▼
//! ConnectionHandle (单会话, 绑定单个 host)
//!       │
//!       ▼
//! CipDriver (get_attribute_single / set_attribute_single)
//! ```
//!
//! 一个驱动实例只能打开一个 host：重复 open 被驱动静默忽略，close 不带参数，
//! 因此一个 ConnectionHandle 在整个生命周期内只绑定一个 host。

mod connection;
mod driver;
mod error;
mod loopback;
mod types;

pub use connection::ConnectionHandle;
pub use driver::CipDriver;
pub use error::{DriverError, ProtocolError};
pub use loopback::LoopbackDriver;
pub use types::*;
