//! 基于 `tracing` 的输出端
//!
//! 每条记录转成一个 tracing 事件。tracing 只有五个级别，
//! notice 并入 INFO，error 及以上全部并入 ERROR，原始级别保存在 `level` 字段。

use super::{Level, LogContext, Logger};
use crate::error::LogError;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn log(&self, message: &str, level: Level, context: &LogContext) -> Result<(), LogError> {
        let fields = context.to_json();
        let severity = level.as_str();
        match level {
            Level::Debug => debug!(level = severity, context = %fields, "{}", message),
            Level::Info | Level::Notice => info!(level = severity, context = %fields, "{}", message),
            Level::Warning => warn!(level = severity, context = %fields, "{}", message),
            Level::Error | Level::Critical | Level::Alert | Level::Emergency => {
                error!(level = severity, context = %fields, "{}", message)
            }
        }
        Ok(())
    }
}
