//! 请求构建：把路径/写入值模板按单条记录解析成具体请求。

use crate::template::{FieldResolver, FieldTemplate, RecordLookup, ResolutionError, coerce_bytes, coerce_u32};
use domain::{AttributePath, AttributeRequest, Record};
use serde_json::Value;

/// CIP 对象路径模板。
#[derive(Debug, Clone, PartialEq)]
pub struct PathTemplate {
    pub class_id: FieldTemplate,
    pub instance_id: FieldTemplate,
    /// 解析为 null 时路径不带 attribute。
    pub attribute_id: Option<FieldTemplate>,
}

impl Default for PathTemplate {
    fn default() -> Self {
        Self {
            class_id: FieldTemplate::literal(1),
            instance_id: FieldTemplate::literal(1),
            attribute_id: None,
        }
    }
}

/// 请求类型模板。
#[derive(Debug, Clone, PartialEq)]
pub enum OperationTemplate {
    Read,
    Write { value: FieldTemplate },
}

impl OperationTemplate {
    /// 写请求，默认写入两个零字节。
    pub fn write_default() -> Self {
        Self::Write {
            value: FieldTemplate::literal(vec![0u8, 0]),
        }
    }
}

/// 请求构建器。
#[derive(Debug, Clone)]
pub struct RequestBuilder<R = RecordLookup> {
    path: PathTemplate,
    operation: OperationTemplate,
    resolver: R,
}

impl<R: FieldResolver> RequestBuilder<R> {
    pub fn new(path: PathTemplate, operation: OperationTemplate, resolver: R) -> Self {
        Self {
            path,
            operation,
            resolver,
        }
    }

    pub fn build(&self, record: &Record) -> Result<AttributeRequest, ResolutionError> {
        let class_id = coerce_u32(
            "class_id",
            self.path.class_id.resolve("class_id", &self.resolver, record)?,
        )?;
        let instance_id = coerce_u32(
            "instance_id",
            self.path
                .instance_id
                .resolve("instance_id", &self.resolver, record)?,
        )?;
        let attribute_id = match &self.path.attribute_id {
            None => None,
            Some(template) => match template.resolve("attribute_id", &self.resolver, record)? {
                Value::Null => None,
                value => Some(coerce_u32("attribute_id", value)?),
            },
        };
        let path = AttributePath::new(class_id, instance_id, attribute_id);

        match &self.operation {
            OperationTemplate::Read => Ok(AttributeRequest::read(path)),
            OperationTemplate::Write { value } => {
                let bytes = coerce_bytes("value", value.resolve("value", &self.resolver, record)?)?;
                Ok(AttributeRequest::write(path, bytes))
            }
        }
    }
}
