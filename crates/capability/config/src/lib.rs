//! 应用运行配置加载。
//!
//! 路径与写入值字段以原始字符串保存，`{{ $field }}` 形式的表达式由处理器按记录解析。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 请求类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Read,
    Write,
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub operation: OperationKind,
    pub class_id: String,
    pub instance_id: String,
    pub attribute_id: Option<String>,
    pub write_value: String,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_multiplier: f64,
    pub retry_max_delay_ms: u64,
    /// true：连接失败时中止当前批次并返回错误；false：记录日志后跳过。
    pub abort_on_connection_failure: bool,
    pub enrich_exclude_existing: bool,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("CIP_HOST").unwrap_or_else(|_| "localhost".to_string());
        if host.trim().is_empty() {
            return Err(ConfigError::Invalid("CIP_HOST".to_string(), host));
        }
        let operation = read_operation("CIP_OPERATION")?;
        let class_id = env::var("CIP_CLASS_ID").unwrap_or_else(|_| "1".to_string());
        let instance_id = env::var("CIP_INSTANCE_ID").unwrap_or_else(|_| "1".to_string());
        let attribute_id = read_optional("CIP_ATTRIBUTE_ID");
        let write_value = env::var("CIP_WRITE_VALUE").unwrap_or_else(|_| "[0, 0]".to_string());
        let max_retries = read_u32_with_default("CIP_MAX_RETRIES", 5)?;
        let retry_base_delay_ms = read_u64_with_default("CIP_RETRY_BASE_DELAY_MS", 1000)?;
        let retry_multiplier = read_f64_with_default("CIP_RETRY_MULTIPLIER", 1.0)?;
        let retry_max_delay_ms = read_u64_with_default("CIP_RETRY_MAX_DELAY_MS", 60_000)?;
        let abort_on_connection_failure = read_connection_failure("CIP_ON_CONNECTION_FAILURE")?;
        let enrich_exclude_existing = read_bool_with_default("CIP_ENRICH_EXCLUDE_EXISTING", true);

        Ok(Self {
            host,
            operation,
            class_id,
            instance_id,
            attribute_id,
            write_value,
            max_retries,
            retry_base_delay_ms,
            retry_multiplier,
            retry_max_delay_ms,
            abort_on_connection_failure,
            enrich_exclude_existing,
        })
    }
}

fn read_operation(key: &str) -> Result<OperationKind, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(OperationKind::Read),
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "read" | "get" => Ok(OperationKind::Read),
        "write" | "set" => Ok(OperationKind::Write),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}

fn read_connection_failure(key: &str) -> Result<bool, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(false),
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "skip" => Ok(false),
        "abort" => Ok(true),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}

fn read_u32_with_default(key: &str, default: u32) -> Result<u32, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_f64_with_default(key: &str, default: f64) -> Result<f64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed >= 0.0 => Ok(parsed),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
