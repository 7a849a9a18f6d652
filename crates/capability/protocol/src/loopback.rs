//! 回环驱动
//!
//! 在内存中模拟一个 CIP 设备：属性表按路径存储，读不存在的路径返回
//! `PATH_DESTINATION_UNKNOWN`。用于本地联调，不做任何网络 IO。

use crate::driver::CipDriver;
use crate::error::DriverError;
use crate::types::DriverStatus;
use domain::AttributeValue;
use std::collections::HashMap;

/// 内存设备驱动
#[derive(Debug, Default)]
pub struct LoopbackDriver {
    attributes: HashMap<Vec<u32>, AttributeValue>,
    read_only: bool,
    session: Option<String>,
    status: Option<DriverStatus>,
}

impl LoopbackDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置属性值
    pub fn with_attribute(mut self, path: &[u32], value: AttributeValue) -> Self {
        self.attributes.insert(path.to_vec(), value);
        self
    }

    /// 拒绝所有写请求（SERVICE_NOT_SUPPORTED）
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// 当前打开的 host
    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.session.is_none() {
            return Err(DriverError::new("session not open"));
        }
        Ok(())
    }
}

impl CipDriver for LoopbackDriver {
    fn open(&mut self, host: &str) -> Result<(), DriverError> {
        if self.session.is_some() {
            return Ok(());
        }
        if host.trim().is_empty() {
            return Err(DriverError::new("empty host"));
        }
        self.session = Some(host.to_string());
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.session = None;
        Ok(())
    }

    fn get_attribute_single(&mut self, path: &[u32]) -> Result<Option<AttributeValue>, DriverError> {
        self.ensure_open()?;
        match self.attributes.get(path) {
            Some(value) => {
                self.status = Some(DriverStatus::success());
                Ok(Some(value.clone()))
            }
            None => {
                self.status = Some(DriverStatus::new(
                    DriverStatus::PATH_DESTINATION_UNKNOWN,
                    "path destination unknown",
                ));
                Ok(None)
            }
        }
    }

    fn set_attribute_single(&mut self, value: &[u8], path: &[u32]) -> Result<bool, DriverError> {
        self.ensure_open()?;
        if self.read_only {
            self.status = Some(DriverStatus::new(
                DriverStatus::SERVICE_NOT_SUPPORTED,
                "service not supported",
            ));
            return Ok(false);
        }
        self.attributes
            .insert(path.to_vec(), AttributeValue::Bytes(value.to_vec()));
        self.status = Some(DriverStatus::success());
        Ok(true)
    }

    fn status(&self) -> Result<DriverStatus, DriverError> {
        self.status
            .clone()
            .ok_or_else(|| DriverError::new("no request issued"))
    }
}
