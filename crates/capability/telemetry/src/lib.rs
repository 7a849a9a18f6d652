//! 追踪初始化、批次 ID 与基础指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 基础指标快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub batches_processed: u64,
    pub batches_skipped: u64,
    pub requests_succeeded: u64,
    pub requests_failed: u64,
    pub connection_failures: u64,
    pub reconnects: u64,
    pub dropped_unresolved: u64,
}

/// 基础指标。
pub struct TelemetryMetrics {
    batches_processed: AtomicU64,
    batches_skipped: AtomicU64,
    requests_succeeded: AtomicU64,
    requests_failed: AtomicU64,
    connection_failures: AtomicU64,
    reconnects: AtomicU64,
    dropped_unresolved: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            batches_processed: AtomicU64::new(0),
            batches_skipped: AtomicU64::new(0),
            requests_succeeded: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            connection_failures: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            dropped_unresolved: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_processed: self.batches_processed.load(Ordering::Relaxed),
            batches_skipped: self.batches_skipped.load(Ordering::Relaxed),
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            connection_failures: self.connection_failures.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            dropped_unresolved: self.dropped_unresolved.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info，日志写到 stderr，stdout 留给输出记录）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// 生成新的批次 ID。
pub fn new_batch_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录完成的批次。
pub fn record_batch_processed() {
    metrics().batches_processed.fetch_add(1, Ordering::Relaxed);
}

/// 记录因无法连接而整体跳过的批次。
pub fn record_batch_skipped() {
    metrics().batches_skipped.fetch_add(1, Ordering::Relaxed);
}

/// 记录成功的属性请求。
pub fn record_request_success() {
    metrics().requests_succeeded.fetch_add(1, Ordering::Relaxed);
}

/// 记录被设备拒绝的属性请求（重试用尽后）。
pub fn record_request_failure() {
    metrics().requests_failed.fetch_add(1, Ordering::Relaxed);
}

/// 记录连接级失败。
pub fn record_connection_failure() {
    metrics()
        .connection_failures
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录重试前的重连。
pub fn record_reconnect() {
    metrics().reconnects.fetch_add(1, Ordering::Relaxed);
}

/// 记录因字段无法解析而丢弃的记录。
pub fn record_dropped_unresolved() {
    metrics()
        .dropped_unresolved
        .fetch_add(1, Ordering::Relaxed);
}
