//! 批处理状态机
//!
//! ```text
//! process_batch(records)
//!       │
//!       ├── 未连接 → connect（失败时按 OnConnectionFailure 跳过批次或返回错误）
//!       │
//!       └── 逐条记录：
//!             RequestBuilder::build ── 失败 → 丢弃该记录
//!                   │
//!                   ▼
//!             RetryExecutor::execute(ConnectionHandle::execute, reconnect)
//!                   │
//!                   ├── 成功 → OutputRecord（保持输入顺序）
//!                   ├── 请求级失败 → 查询驱动状态并记录日志，会话保持
//!                   └── 连接级失败 → 重置会话，按 OnConnectionFailure 继续或中止
//! ```

use crate::request::{OperationTemplate, PathTemplate, RequestBuilder};
use crate::template::{FieldResolver, RecordLookup};
use cip_protocol::{CipDriver, ConnectionHandle, DriverStatus, ProtocolError};
use cip_retry::{RetryExecutor, RetryPolicy};
use cip_telemetry::{
    new_batch_id, record_batch_processed, record_batch_skipped, record_connection_failure,
    record_dropped_unresolved, record_reconnect, record_request_failure, record_request_success,
};
use domain::{AttributeRequest, AttributeValue, EnrichPolicy, OutputRecord, Record};
use tracing::{error, info, info_span, warn};

/// 连接级失败的处理策略。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnConnectionFailure {
    /// 记录日志后继续：批次开始时连不上则整批跳过，处理中断线则丢弃当前记录并在下一条前重连。
    #[default]
    SkipBatch,
    /// 返回错误，当前批次剩余记录不再处理。
    Abort,
}

/// 处理器配置。
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub host: String,
    pub path: PathTemplate,
    pub operation: OperationTemplate,
    pub retry: RetryPolicy,
    pub on_connection_failure: OnConnectionFailure,
    pub enrich: EnrichPolicy,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            path: PathTemplate::default(),
            operation: OperationTemplate::Read,
            retry: RetryPolicy::default(),
            on_connection_failure: OnConnectionFailure::default(),
            enrich: EnrichPolicy::default(),
        }
    }
}

/// 单个请求的最终结果。
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Success(AttributeValue),
    /// 设备拒绝请求（重试用尽），会话仍可用。
    Failure(DriverStatus),
    /// 会话不可用，已重置为 Disconnected。
    ConnectionFailure(ProtocolError),
}

/// 批处理错误（仅 `OnConnectionFailure::Abort` 下产生）。
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("connection to {host} failed: {source}")]
    Connection {
        host: String,
        #[source]
        source: ProtocolError,
    },
}

/// 单属性读写处理器，独占一个会话。
pub struct AttributeProcessor<D: CipDriver, R = RecordLookup> {
    host: String,
    connection: ConnectionHandle<D>,
    builder: RequestBuilder<R>,
    retry: RetryExecutor,
    on_connection_failure: OnConnectionFailure,
    enrich: EnrichPolicy,
}

impl<D: CipDriver> AttributeProcessor<D, RecordLookup> {
    /// 创建处理器并尝试建立连接（失败只记录日志）。
    pub fn start(config: ProcessorConfig, driver: D) -> Self {
        Self::start_with_resolver(config, driver, RecordLookup)
    }
}

impl<D: CipDriver, R: FieldResolver> AttributeProcessor<D, R> {
    pub fn start_with_resolver(config: ProcessorConfig, driver: D, resolver: R) -> Self {
        let mut connection = ConnectionHandle::new(config.host.clone(), driver);
        if let Err(err) = connection.connect() {
            record_connection_failure();
            error!(target: "cip.processor", host = %config.host, error = %err, "initial_connect_failed");
        }
        Self {
            host: config.host,
            connection,
            builder: RequestBuilder::new(config.path, config.operation, resolver),
            retry: RetryExecutor::new(config.retry),
            on_connection_failure: config.on_connection_failure,
            enrich: config.enrich,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn connection(&self) -> &ConnectionHandle<D> {
        &self.connection
    }

    /// 处理一个批次，返回与成功记录一一对应、保持输入顺序的输出。
    pub fn process_batch(&mut self, records: &[Record]) -> Result<Vec<Record>, ProcessError> {
        let batch_id = new_batch_id();
        let span = info_span!(
            target: "cip.processor",
            "batch",
            batch_id = %batch_id,
            host = %self.host,
            size = records.len()
        );
        let _entered = span.enter();

        if !self.connection.is_connected() {
            warn!(target: "cip.processor", host = %self.host, "not_connected_reconnecting");
            if let Err(err) = self.connection.connect() {
                record_connection_failure();
                return match self.on_connection_failure {
                    OnConnectionFailure::SkipBatch => {
                        record_batch_skipped();
                        error!(target: "cip.processor", host = %self.host, error = %err, "batch_skipped");
                        Ok(Vec::new())
                    }
                    OnConnectionFailure::Abort => {
                        error!(target: "cip.processor", host = %self.host, error = %err, "batch_aborted");
                        Err(ProcessError::Connection {
                            host: self.host.clone(),
                            source: err,
                        })
                    }
                };
            }
        }

        let mut outputs = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let request = match self.builder.build(record) {
                Ok(request) => request,
                Err(err) => {
                    record_dropped_unresolved();
                    warn!(target: "cip.processor", index = index, error = %err, "record_unresolved");
                    continue;
                }
            };

            let outcome = if self.connection.is_connected() {
                self.execute(&request)
            } else {
                // 前一条记录的连接级失败已重置会话
                match self.connection.connect() {
                    Ok(()) => self.execute(&request),
                    Err(err) => RequestOutcome::ConnectionFailure(err),
                }
            };

            match outcome {
                RequestOutcome::Success(value) => {
                    record_request_success();
                    let output = OutputRecord::new(self.host.clone(), &request.path, value);
                    outputs.push(output.enrich(record, self.enrich));
                }
                RequestOutcome::Failure(status) => {
                    record_request_failure();
                    error!(
                        target: "cip.processor",
                        host = %self.host,
                        path = %request.path,
                        operation = request.operation.name(),
                        value = ?request.write_value(),
                        status = %status,
                        "attribute_request_failed"
                    );
                }
                RequestOutcome::ConnectionFailure(err) => {
                    record_connection_failure();
                    error!(
                        target: "cip.processor",
                        host = %self.host,
                        path = %request.path,
                        operation = request.operation.name(),
                        error = %err,
                        "connection_failed"
                    );
                    if self.on_connection_failure == OnConnectionFailure::Abort {
                        return Err(ProcessError::Connection {
                            host: self.host.clone(),
                            source: err,
                        });
                    }
                }
            }
        }

        record_batch_processed();
        info!(
            target: "cip.processor",
            inputs = records.len(),
            outputs = outputs.len(),
            "batch_processed"
        );
        Ok(outputs)
    }

    /// 通过重试执行器执行单个请求，每次重试前重建会话。
    pub fn execute(&mut self, request: &AttributeRequest) -> RequestOutcome {
        let result = self.retry.execute(
            &mut self.connection,
            |connection: &mut ConnectionHandle<D>| connection.execute(request),
            |connection: &mut ConnectionHandle<D>| {
                record_reconnect();
                connection.reconnect()
            },
        );
        let err = match result {
            Ok(value) => return RequestOutcome::Success(value),
            Err(err) => err.into_error(),
        };

        if !err.is_connection_level() {
            match self.connection.status() {
                Ok(status) => return RequestOutcome::Failure(status),
                Err(status_err) => {
                    warn!(target: "cip.processor", host = %self.host, error = %status_err, "status_unavailable");
                    self.reset_connection();
                    return RequestOutcome::ConnectionFailure(status_err);
                }
            }
        }
        self.reset_connection();
        RequestOutcome::ConnectionFailure(err)
    }

    /// 关闭会话（幂等）。
    pub fn stop(&mut self) {
        self.reset_connection();
        info!(target: "cip.processor", host = %self.host, "processor_stopped");
    }

    fn reset_connection(&mut self) {
        if let Err(err) = self.connection.disconnect() {
            warn!(target: "cip.processor", host = %self.host, error = %err, "session_close_failed");
        }
    }
}
