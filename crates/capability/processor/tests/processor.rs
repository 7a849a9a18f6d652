use cip_processor::{
    AttributeProcessor, FieldTemplate, OnConnectionFailure, OperationTemplate, PathTemplate,
    ProcessError, ProcessorConfig, RequestOutcome,
};
use cip_protocol::{CipDriver, DriverError, DriverStatus};
use cip_retry::RetryPolicy;
use domain::{AttributePath, AttributeRequest, AttributeValue, EnrichPolicy, Record};
use serde_json::{Value, json};
use std::cell::Cell;
use std::collections::VecDeque;

/// 驱动对单次读写的应答。
#[derive(Debug, Clone)]
enum Reply {
    Value(i64),
    Reject,
    Fault,
}

/// 按脚本应答的驱动，记录全部调用。
#[derive(Debug, Default)]
struct ScriptedDriver {
    replies: VecDeque<Reply>,
    /// open 的脚本结果；为空时 open 成功。
    open_results: VecDeque<bool>,
    never_opens: bool,
    opens: Vec<String>,
    closes: usize,
    reads: Vec<Vec<u32>>,
    writes: Vec<(Vec<u8>, Vec<u32>)>,
    status_calls: Cell<usize>,
}

impl ScriptedDriver {
    fn with_replies(replies: Vec<Reply>) -> Self {
        Self {
            replies: replies.into(),
            ..Default::default()
        }
    }

    fn next_reply(&mut self) -> Reply {
        self.replies.pop_front().unwrap_or(Reply::Value(255))
    }
}

impl CipDriver for ScriptedDriver {
    fn open(&mut self, host: &str) -> Result<(), DriverError> {
        self.opens.push(host.to_string());
        if self.never_opens || !self.open_results.pop_front().unwrap_or(true) {
            return Err(DriverError::new("host unreachable"));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.closes += 1;
        Ok(())
    }

    fn get_attribute_single(&mut self, path: &[u32]) -> Result<Option<AttributeValue>, DriverError> {
        self.reads.push(path.to_vec());
        match self.next_reply() {
            Reply::Value(value) => Ok(Some(AttributeValue::Int(value))),
            Reply::Reject => Ok(None),
            Reply::Fault => Err(DriverError::new("connection reset by peer")),
        }
    }

    fn set_attribute_single(&mut self, value: &[u8], path: &[u32]) -> Result<bool, DriverError> {
        self.writes.push((value.to_vec(), path.to_vec()));
        match self.next_reply() {
            Reply::Value(_) => Ok(true),
            Reply::Reject => Ok(false),
            Reply::Fault => Err(DriverError::new("connection reset by peer")),
        }
    }

    fn status(&self) -> Result<DriverStatus, DriverError> {
        self.status_calls.set(self.status_calls.get() + 1);
        Ok(DriverStatus::new(1, "bad things"))
    }
}

fn config(max_retries: u32) -> ProcessorConfig {
    ProcessorConfig {
        retry: RetryPolicy::no_wait(max_retries),
        ..Default::default()
    }
}

fn records(values: Vec<Value>) -> Vec<Record> {
    values
        .into_iter()
        .map(|value| value.as_object().cloned().expect("object"))
        .collect()
}

fn empty_records(count: usize) -> Vec<Record> {
    vec![Record::new(); count]
}

fn values(outputs: &[Record]) -> Vec<Value> {
    outputs
        .iter()
        .map(|record| record.get("value").cloned().expect("value"))
        .collect()
}

#[test]
fn read_with_expressions() {
    let config = ProcessorConfig {
        host: "dummy".to_string(),
        path: PathTemplate {
            class_id: FieldTemplate::parse("{{ $class_id }}"),
            instance_id: FieldTemplate::parse("{{ $instance_num }}"),
            attribute_id: Some(FieldTemplate::parse("{{ $attribute_num }}")),
        },
        ..config(0)
    };
    let driver = ScriptedDriver::with_replies(vec![Reply::Value(5309)]);
    let mut processor = AttributeProcessor::start(config, driver);
    assert_eq!(processor.connection().driver().opens, vec!["dummy".to_string()]);

    let outputs = processor
        .process_batch(&records(vec![
            json!({ "class_id": 8, "instance_num": 6, "attribute_num": 7 }),
        ]))
        .expect("batch");
    processor.stop();

    let driver = processor.connection().driver();
    assert_eq!(driver.reads, vec![vec![8, 6, 7]]);
    assert_eq!(driver.closes, 1);
    assert_eq!(
        outputs,
        records(vec![json!({ "host": "dummy", "path": [8, 6, 7], "value": 5309 })])
    );
}

#[test]
fn write_with_defaults() {
    let config = ProcessorConfig {
        operation: OperationTemplate::write_default(),
        ..config(0)
    };
    let mut processor = AttributeProcessor::start(config, ScriptedDriver::default());
    let outputs = processor.process_batch(&empty_records(1)).expect("batch");
    processor.stop();

    assert_eq!(
        processor.connection().driver().writes,
        vec![(vec![0, 0], vec![1, 1])]
    );
    assert_eq!(
        outputs,
        records(vec![json!({ "host": "localhost", "path": [1, 1], "value": [0, 0] })])
    );
}

#[test]
fn write_value_from_record() {
    let config = ProcessorConfig {
        operation: OperationTemplate::Write {
            value: FieldTemplate::parse("{{ $value }}"),
        },
        ..config(0)
    };
    let mut processor = AttributeProcessor::start(config, ScriptedDriver::default());
    let outputs = processor
        .process_batch(&records(vec![json!({ "value": [5, 3, 0, 9] })]))
        .expect("batch");
    assert_eq!(
        processor.connection().driver().writes,
        vec![(vec![5, 3, 0, 9], vec![1, 1])]
    );
    assert_eq!(values(&outputs), vec![json!([5, 3, 0, 9])]);
}

#[test]
fn all_successes_preserve_order() {
    let driver = ScriptedDriver::with_replies(vec![
        Reply::Value(1),
        Reply::Value(2),
        Reply::Value(3),
    ]);
    let mut processor = AttributeProcessor::start(config(3), driver);
    let outputs = processor.process_batch(&empty_records(3)).expect("batch");
    assert_eq!(values(&outputs), vec![json!(1), json!(2), json!(3)]);
}

#[test]
fn rejected_request_is_dropped_and_session_kept() {
    let driver = ScriptedDriver::with_replies(vec![Reply::Reject, Reply::Value(255)]);
    let mut processor = AttributeProcessor::start(config(0), driver);
    let outputs = processor.process_batch(&empty_records(2)).expect("batch");

    let driver = processor.connection().driver();
    assert_eq!(driver.reads.len(), 2);
    assert_eq!(driver.status_calls.get(), 1);
    assert_eq!(driver.opens.len(), 1);
    assert!(processor.connection().is_connected());
    assert_eq!(values(&outputs), vec![json!(255)]);
}

#[test]
fn rejections_are_retried_after_reconnect() {
    let driver = ScriptedDriver::with_replies(vec![
        Reply::Value(1),
        Reply::Reject,
        Reply::Reject,
        Reply::Value(3),
    ]);
    let mut processor = AttributeProcessor::start(config(1), driver);
    let outputs = processor.process_batch(&empty_records(3)).expect("batch");

    let driver = processor.connection().driver();
    assert_eq!(driver.reads.len(), 4);
    assert_eq!(driver.opens.len(), 2);
    assert_eq!(driver.closes, 1);
    assert!(processor.connection().is_connected());
    assert_eq!(values(&outputs), vec![json!(1), json!(3)]);
}

#[test]
fn reconnects_before_each_retry() {
    let driver = ScriptedDriver::with_replies(vec![Reply::Fault, Reply::Fault, Reply::Value(42)]);
    let mut processor = AttributeProcessor::start(config(2), driver);
    let outputs = processor.process_batch(&empty_records(1)).expect("batch");

    let driver = processor.connection().driver();
    assert_eq!(driver.reads.len(), 3);
    assert_eq!(driver.opens.len(), 3);
    assert_eq!(driver.closes, 2);
    assert_eq!(values(&outputs), vec![json!(42)]);

    processor.stop();
    assert_eq!(processor.connection().driver().closes, 3);
}

#[test]
fn execute_reports_outcomes() {
    let driver = ScriptedDriver::with_replies(vec![Reply::Value(7), Reply::Reject, Reply::Fault]);
    let mut processor = AttributeProcessor::start(config(0), driver);
    let request = AttributeRequest::read(AttributePath::new(8, 6, Some(7)));

    assert_eq!(
        processor.execute(&request),
        RequestOutcome::Success(AttributeValue::Int(7))
    );
    assert_eq!(
        processor.execute(&request),
        RequestOutcome::Failure(DriverStatus::new(1, "bad things"))
    );
    assert!(matches!(
        processor.execute(&request),
        RequestOutcome::ConnectionFailure(_)
    ));
    assert!(!processor.connection().is_connected());
}

#[test]
fn connection_failure_skips_record_and_reconnects() {
    let driver = ScriptedDriver::with_replies(vec![Reply::Fault, Reply::Value(7)]);
    let mut processor = AttributeProcessor::start(config(0), driver);
    let outputs = processor.process_batch(&empty_records(2)).expect("batch");

    let driver = processor.connection().driver();
    assert_eq!(driver.reads.len(), 2);
    assert_eq!(driver.opens.len(), 2);
    assert_eq!(driver.closes, 1);
    assert_eq!(values(&outputs), vec![json!(7)]);
}

#[test]
fn failed_reconnect_ends_retries() {
    let mut driver = ScriptedDriver::with_replies(vec![Reply::Fault, Reply::Value(9)]);
    // 初次连接成功，重试前的重连失败，下一条记录前的重连成功
    driver.open_results = vec![true, false, true].into();
    let mut processor = AttributeProcessor::start(config(3), driver);
    let outputs = processor.process_batch(&empty_records(2)).expect("batch");

    let driver = processor.connection().driver();
    assert_eq!(driver.reads.len(), 2);
    assert_eq!(driver.opens.len(), 3);
    assert_eq!(values(&outputs), vec![json!(9)]);
}

#[test]
fn abort_stops_remaining_records() {
    let driver = ScriptedDriver::with_replies(vec![Reply::Value(1), Reply::Fault, Reply::Value(3)]);
    let config = ProcessorConfig {
        on_connection_failure: OnConnectionFailure::Abort,
        ..config(0)
    };
    let mut processor = AttributeProcessor::start(config, driver);
    let err = processor
        .process_batch(&empty_records(3))
        .expect_err("aborted");
    assert!(matches!(err, ProcessError::Connection { .. }));
    assert_eq!(processor.connection().driver().reads.len(), 2);
    assert!(!processor.connection().is_connected());
}

#[test]
fn initial_connect_failure_skips_batch() {
    let driver = ScriptedDriver {
        never_opens: true,
        ..Default::default()
    };
    let mut processor = AttributeProcessor::start(config(0), driver);
    assert!(!processor.connection().is_connected());

    let outputs = processor.process_batch(&empty_records(1)).expect("skipped");
    assert!(outputs.is_empty());
    assert!(processor.connection().driver().reads.is_empty());
    assert_eq!(processor.connection().driver().opens.len(), 2);
}

#[test]
fn initial_connect_failure_propagates_under_abort() {
    let driver = ScriptedDriver {
        never_opens: true,
        ..Default::default()
    };
    let config = ProcessorConfig {
        on_connection_failure: OnConnectionFailure::Abort,
        ..config(0)
    };
    let mut processor = AttributeProcessor::start(config, driver);
    let err = processor
        .process_batch(&empty_records(1))
        .expect_err("connection error");
    assert!(matches!(err, ProcessError::Connection { ref host, .. } if host == "localhost"));
    assert!(processor.connection().driver().reads.is_empty());
}

#[test]
fn lazy_connect_on_next_batch() {
    let mut driver = ScriptedDriver::with_replies(vec![Reply::Value(42)]);
    driver.open_results = vec![false].into();
    let mut processor = AttributeProcessor::start(config(0), driver);
    assert!(!processor.connection().is_connected());

    let outputs = processor.process_batch(&empty_records(1)).expect("batch");
    assert_eq!(values(&outputs), vec![json!(42)]);
    assert!(processor.connection().is_connected());
}

#[test]
fn unresolved_record_is_dropped() {
    let config = ProcessorConfig {
        path: PathTemplate {
            attribute_id: Some(FieldTemplate::parse("{{ $attribute_num }}")),
            ..Default::default()
        },
        ..config(0)
    };
    let driver = ScriptedDriver::with_replies(vec![Reply::Value(1), Reply::Value(3)]);
    let mut processor = AttributeProcessor::start(config, driver);
    let outputs = processor
        .process_batch(&records(vec![
            json!({ "attribute_num": 1 }),
            json!({ "attribute_num": "seven" }),
            json!({ "attribute_num": 3 }),
        ]))
        .expect("batch");

    assert_eq!(
        processor.connection().driver().reads,
        vec![vec![1, 1, 1], vec![1, 1, 3]]
    );
    assert_eq!(values(&outputs), vec![json!(1), json!(3)]);
    assert!(processor.connection().is_connected());
}

#[test]
fn merge_enrichment_keeps_input_fields() {
    let config = ProcessorConfig {
        enrich: EnrichPolicy::Merge,
        ..config(0)
    };
    let driver = ScriptedDriver::with_replies(vec![Reply::Value(42)]);
    let mut processor = AttributeProcessor::start(config, driver);
    let outputs = processor
        .process_batch(&records(vec![json!({ "foo": "bar" })]))
        .expect("batch");
    assert_eq!(
        outputs,
        records(vec![json!({ "foo": "bar", "host": "localhost", "path": [1, 1], "value": 42 })])
    );
}

#[test]
fn stop_is_idempotent() {
    let mut processor = AttributeProcessor::start(config(0), ScriptedDriver::default());
    processor.stop();
    processor.stop();
    assert_eq!(processor.connection().driver().closes, 1);

    let driver = ScriptedDriver {
        never_opens: true,
        ..Default::default()
    };
    let mut processor = AttributeProcessor::start(config(0), driver);
    processor.stop();
    processor.stop();
    assert_eq!(processor.connection().driver().closes, 0);
}
