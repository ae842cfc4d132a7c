//! 日志输出端模块
//!
//! 拦截器通过 [`Logger`] 输出日志记录：一条消息、一个级别和一份结构化上下文。

pub mod context;
pub mod level;
pub mod memory;
pub mod nop;
pub mod tracing_logger;

pub use context::{LogContext, Payload, Value};
pub use level::Level;
pub use memory::{Entry, MemoryLogger};
pub use nop::NopLogger;
pub use tracing_logger::TracingLogger;

use crate::error::LogError;
use std::sync::Arc;

/// 日志输出端 trait
pub trait Logger: Send + Sync {
    fn log(&self, message: &str, level: Level, context: &LogContext) -> Result<(), LogError>;
}

/// 共享的日志输出端
pub type SharedLogger = Arc<dyn Logger>;

/// 可放入 `tonic::Request` extensions 的日志输出端
///
/// 服务端拦截器会优先使用请求里携带的输出端。
#[derive(Clone)]
pub struct LoggerExtension(pub SharedLogger);

/// 输出一条记录，输出端的错误只记 trace 后丢弃
pub(crate) fn emit(logger: &dyn Logger, message: &str, level: Level, context: &LogContext) {
    if let Err(err) = logger.log(message, level, context) {
        tracing::trace!(error = %err, record = message, "grpc log record dropped");
    }
}
