//! 字段模板与逐记录解析。

use domain::Record;
use serde_json::Value;

/// 字段解析错误（只影响当前记录，不重试）。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolutionError {
    #[error("{field}: cannot evaluate `{expr}`: {reason}")]
    Evaluate {
        field: &'static str,
        expr: String,
        reason: String,
    },
    #[error("{field}: expected {expected}, got {value}")]
    Coerce {
        field: &'static str,
        expected: &'static str,
        value: Value,
    },
}

/// 表达式求值能力。
pub trait FieldResolver {
    fn evaluate(&self, expr: &str, record: &Record) -> Result<Value, String>;
}

/// 记录字段查找：`$name` 或 `$a.b` 形式，逐级取嵌套对象字段。
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordLookup;

impl FieldResolver for RecordLookup {
    fn evaluate(&self, expr: &str, record: &Record) -> Result<Value, String> {
        let Some(name) = expr.trim().strip_prefix('$') else {
            return Err("unsupported expression".to_string());
        };
        let mut segments = name.split('.');
        let first = segments.next().unwrap_or_default();
        let mut current = record
            .get(first)
            .ok_or_else(|| format!("field `{}` not found", first))?;
        for segment in segments {
            current = current
                .get(segment)
                .ok_or_else(|| format!("field `{}` not found", name))?;
        }
        Ok(current.clone())
    }
}

/// 配置字段：字面量，或按记录求值的表达式。
#[derive(Debug, Clone, PartialEq)]
pub enum FieldTemplate {
    Literal(Value),
    Expr(String),
}

impl FieldTemplate {
    /// 解析配置字符串：`{{ ... }}` 为表达式，其余按 JSON 字面量解析，失败时视为字符串。
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(inner) = trimmed
            .strip_prefix("{{")
            .and_then(|rest| rest.strip_suffix("}}"))
        {
            return Self::Expr(inner.trim().to_string());
        }
        serde_json::from_str(trimmed)
            .map(Self::Literal)
            .unwrap_or_else(|_| Self::Literal(Value::String(trimmed.to_string())))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn expr(expr: impl Into<String>) -> Self {
        Self::Expr(expr.into())
    }

    pub fn resolve<R: FieldResolver + ?Sized>(
        &self,
        field: &'static str,
        resolver: &R,
        record: &Record,
    ) -> Result<Value, ResolutionError> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Expr(expr) => {
                resolver
                    .evaluate(expr, record)
                    .map_err(|reason| ResolutionError::Evaluate {
                        field,
                        expr: expr.clone(),
                        reason,
                    })
            }
        }
    }
}

/// 非负整数（允许数字字符串）。
pub(crate) fn coerce_u32(field: &'static str, value: Value) -> Result<u32, ResolutionError> {
    let parsed = match &value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.ok_or(ResolutionError::Coerce {
        field,
        expected: "non-negative integer",
        value,
    })
}

/// 字节串：0..=255 的整数数组，或字符串（UTF-8 字节）。
pub(crate) fn coerce_bytes(field: &'static str, value: Value) -> Result<Vec<u8>, ResolutionError> {
    let parsed = match &value {
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
            .collect::<Option<Vec<u8>>>(),
        Value::String(text) => Some(text.as_bytes().to_vec()),
        _ => None,
    };
    parsed.ok_or(ResolutionError::Coerce {
        field,
        expected: "byte array",
        value,
    })
}
