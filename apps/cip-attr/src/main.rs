//! 单属性读写宿主：从 stdin 读取批次（每行一个 JSON 数组，或单个对象视为一条记录的批次），
//! 每个批次的输出记录以一行 JSON 数组写到 stdout。
//!
//! 设备由内存回环驱动模拟，预置 Identity 对象（class 1, instance 1）的部分属性。

use cip_config::{AppConfig, OperationKind};
use cip_processor::{
    AttributeProcessor, FieldTemplate, OnConnectionFailure, OperationTemplate, PathTemplate,
    ProcessorConfig,
};
use cip_protocol::LoopbackDriver;
use cip_retry::RetryPolicy;
use cip_telemetry::{init_tracing, metrics};
use domain::{AttributeValue, EnrichPolicy, Record};
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::time::Duration;
use tracing::{error, info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在）
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let mut processor = AttributeProcessor::start(processor_config(&config), loopback_device());

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for (line_no, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let batch = match parse_batch(&line) {
            Ok(batch) => batch,
            Err(err) => {
                warn!(target: "cip.app", line = line_no + 1, error = %err, "batch_parse_failed");
                continue;
            }
        };
        match processor.process_batch(&batch) {
            Ok(outputs) => {
                serde_json::to_writer(&mut stdout, &outputs)?;
                writeln!(stdout)?;
                stdout.flush()?;
            }
            Err(err) => {
                error!(target: "cip.app", line = line_no + 1, error = %err, "batch_failed");
            }
        }
    }

    processor.stop();
    info!(target: "cip.app", metrics = ?metrics().snapshot(), "shutdown");
    Ok(())
}

/// 运行配置 → 处理器配置
fn processor_config(config: &AppConfig) -> ProcessorConfig {
    let operation = match config.operation {
        OperationKind::Read => OperationTemplate::Read,
        OperationKind::Write => OperationTemplate::Write {
            value: FieldTemplate::parse(&config.write_value),
        },
    };
    let on_connection_failure = if config.abort_on_connection_failure {
        OnConnectionFailure::Abort
    } else {
        OnConnectionFailure::SkipBatch
    };
    let enrich = if config.enrich_exclude_existing {
        EnrichPolicy::ExcludeExisting
    } else {
        EnrichPolicy::Merge
    };
    ProcessorConfig {
        host: config.host.clone(),
        path: PathTemplate {
            class_id: FieldTemplate::parse(&config.class_id),
            instance_id: FieldTemplate::parse(&config.instance_id),
            attribute_id: config.attribute_id.as_deref().map(FieldTemplate::parse),
        },
        operation,
        retry: RetryPolicy {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            multiplier: config.retry_multiplier,
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        },
        on_connection_failure,
        enrich,
    }
}

/// Identity 对象：vendor id、device type、product code、product name
fn loopback_device() -> LoopbackDriver {
    LoopbackDriver::new()
        .with_attribute(&[1, 1, 1], AttributeValue::Int(1))
        .with_attribute(&[1, 1, 2], AttributeValue::Int(14))
        .with_attribute(&[1, 1, 3], AttributeValue::Int(54))
        .with_attribute(&[1, 1, 7], AttributeValue::Text("loopback".to_string()))
}

fn parse_batch(line: &str) -> Result<Vec<Record>, String> {
    match serde_json::from_str::<Value>(line).map_err(|err| err.to_string())? {
        Value::Object(record) => Ok(vec![record]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(record) => Ok(record),
                other => Err(format!("expected object, got {}", other)),
            })
            .collect(),
        other => Err(format!("expected object or array, got {}", other)),
    }
}
