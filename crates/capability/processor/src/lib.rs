//! # 单属性读写处理器
//!
//! 把一批输入记录转换为一批输出记录：
//! - **RequestBuilder**：按记录解析路径/写入值模板
//! - **RetryExecutor**：失败后先重建会话再重试，次数有界
//! - **AttributeProcessor**：维护唯一会话，按输入顺序产出结果，失败记录被丢弃
//!
//! ## 配置格式
//!
//! ```text
//! host          = "192.168.1.10"
//! class_id      = 1                      // 字面量
//! instance_id   = "{{ $instance_num }}"  // 按记录求值
//! attribute_id  = "{{ $attribute_num }}" // 可选，求值为 null 时省略
//! write value   = [0, 0]                 // 仅写请求
//! ```

mod processor;
mod request;
mod template;

pub use processor::{
    AttributeProcessor, OnConnectionFailure, ProcessError, ProcessorConfig, RequestOutcome,
};
pub use request::{OperationTemplate, PathTemplate, RequestBuilder};
pub use template::{FieldResolver, FieldTemplate, RecordLookup, ResolutionError};
