use super::{Level, LogContext, Logger};
use crate::error::LogError;

/// 丢弃所有记录的输出端
#[derive(Debug, Clone, Copy, Default)]
pub struct NopLogger;

impl NopLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for NopLogger {
    fn log(&self, _message: &str, _level: Level, _context: &LogContext) -> Result<(), LogError> {
        Ok(())
    }
}
