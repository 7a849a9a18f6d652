use crate::AttributePath;
use serde::Serialize;
use serde_json::{Map, Value};

/// 输入/输出记录（字段名 → JSON 值）。
pub type Record = Map<String, Value>;

/// 属性值（读结果或写入值）。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Text(String),
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&AttributeValue> for Value {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Bool(v) => Value::Bool(*v),
            AttributeValue::Int(v) => Value::from(*v),
            AttributeValue::Float(v) => Value::from(*v),
            AttributeValue::Bytes(v) => Value::Array(v.iter().map(|b| Value::from(*b)).collect()),
            AttributeValue::Text(v) => Value::String(v.clone()),
        }
    }
}

/// 输出字段与输入记录的合并方式。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnrichPolicy {
    /// 只输出 host/path/value。
    #[default]
    ExcludeExisting,
    /// 保留输入字段，同名字段被覆盖。
    Merge,
}

/// 成功请求的输出。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    pub host: String,
    pub path: Vec<u32>,
    pub value: AttributeValue,
}

impl OutputRecord {
    pub fn new(host: impl Into<String>, path: &AttributePath, value: AttributeValue) -> Self {
        Self {
            host: host.into(),
            path: path.to_vec(),
            value,
        }
    }

    /// 按合并策略生成最终输出记录。
    pub fn enrich(&self, input: &Record, policy: EnrichPolicy) -> Record {
        let mut record = match policy {
            EnrichPolicy::ExcludeExisting => Record::new(),
            EnrichPolicy::Merge => input.clone(),
        };
        record.insert("host".to_string(), Value::String(self.host.clone()));
        record.insert(
            "path".to_string(),
            Value::Array(self.path.iter().map(|s| Value::from(*s)).collect()),
        );
        record.insert("value".to_string(), Value::from(&self.value));
        record
    }
}
