//! 内存输出端
//!
//! 按顺序记录全部日志，供测试断言使用。

use super::{Level, LogContext, Logger};
use crate::error::LogError;
use std::sync::Mutex;

/// 一条已记录的日志
#[derive(Debug, Clone)]
pub struct Entry {
    pub message: String,
    pub level: Level,
    pub context: LogContext,
}

#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<Entry>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取目前为止的全部记录
    pub fn entries(&self) -> Vec<Entry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl Logger for MemoryLogger {
    fn log(&self, message: &str, level: Level, context: &LogContext) -> Result<(), LogError> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Entry {
                message: message.to_string(),
                level,
                context: context.clone(),
            });
        Ok(())
    }
}
