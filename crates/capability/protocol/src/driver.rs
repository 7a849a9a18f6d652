use crate::error::DriverError;
use crate::types::DriverStatus;
use domain::AttributeValue;

/// CIP 协议驱动抽象。
///
/// 路径按 class、instance、attribute 的顺序传入。失败有两种信号：
/// 返回 `Err` 表示驱动异常（会话不可用），返回 `None`/`false` 表示设备拒绝了请求，
/// 具体原因通过 [`CipDriver::status`] 查询。
pub trait CipDriver {
    /// 打开到 host 的会话。已打开时驱动应静默忽略。
    fn open(&mut self, host: &str) -> Result<(), DriverError>;

    /// 关闭会话（幂等）。
    fn close(&mut self) -> Result<(), DriverError>;

    fn get_attribute_single(&mut self, path: &[u32]) -> Result<Option<AttributeValue>, DriverError>;

    fn set_attribute_single(&mut self, value: &[u8], path: &[u32]) -> Result<bool, DriverError>;

    /// 最近一次请求的状态码与描述。
    fn status(&self) -> Result<DriverStatus, DriverError>;
}
