pub mod data;

pub use data::{AttributeValue, EnrichPolicy, OutputRecord, Record};

use serde::Serialize;
use std::fmt;

/// CIP 对象路径：class → instance →（可选）attribute。
///
/// 顺序有意义，驱动调用时按此顺序展开。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AttributePath {
    pub class_id: u32,
    pub instance_id: u32,
    pub attribute_id: Option<u32>,
}

impl AttributePath {
    pub fn new(class_id: u32, instance_id: u32, attribute_id: Option<u32>) -> Self {
        Self {
            class_id,
            instance_id,
            attribute_id,
        }
    }

    /// 按驱动调用顺序展开为整数列表。
    pub fn to_vec(&self) -> Vec<u32> {
        let mut segments = vec![self.class_id, self.instance_id];
        if let Some(attribute_id) = self.attribute_id {
            segments.push(attribute_id);
        }
        segments
    }
}

impl Default for AttributePath {
    fn default() -> Self {
        Self::new(1, 1, None)
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let segments: Vec<String> = self.to_vec().iter().map(|s| s.to_string()).collect();
        write!(f, "[{}]", segments.join(", "))
    }
}

/// 单属性请求类型。写请求携带待写入的字节。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write(Vec<u8>),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Read => "get_attribute_single",
            Self::Write(_) => "set_attribute_single",
        }
    }
}

/// 已解析完成的单属性请求。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRequest {
    pub path: AttributePath,
    pub operation: Operation,
}

impl AttributeRequest {
    pub fn read(path: AttributePath) -> Self {
        Self {
            path,
            operation: Operation::Read,
        }
    }

    pub fn write(path: AttributePath, value: impl Into<Vec<u8>>) -> Self {
        Self {
            path,
            operation: Operation::Write(value.into()),
        }
    }

    /// 写请求的值；读请求返回 `None`。
    pub fn write_value(&self) -> Option<&[u8]> {
        match &self.operation {
            Operation::Read => None,
            Operation::Write(value) => Some(value),
        }
    }
}
