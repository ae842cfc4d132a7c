//! 调用执行上下文
//!
//! 显式传递的调用上下文：截止时间、metadata 以及可选的调用级日志输出端。

use crate::logger::{LoggerExtension, NopLogger, SharedLogger};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tonic::Request;
use tonic::metadata::{KeyAndValueRef, MetadataMap};

/// gRPC 超时头
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// 调用执行上下文
#[derive(Clone, Default)]
pub struct RpcContext {
    deadline: Option<DateTime<Utc>>,
    metadata: MetadataMap,
    logger: Option<SharedLogger>,
}

impl RpcContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从服务端收到的请求构造上下文
    ///
    /// 读取 `grpc-timeout` 作为截止时间，复制 metadata，
    /// 并使用 extensions 中的 [`LoggerExtension`]（如果有）。
    pub fn from_request<T>(request: &Request<T>) -> Self {
        let metadata = request.metadata().clone();
        let deadline = metadata
            .get(GRPC_TIMEOUT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_grpc_timeout)
            .and_then(|timeout| chrono::Duration::from_std(timeout).ok())
            .map(|timeout| Utc::now() + timeout);
        let logger = request
            .extensions()
            .get::<LoggerExtension>()
            .map(|ext| ext.0.clone());

        Self {
            deadline,
            metadata,
            logger,
        }
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        match chrono::Duration::from_std(timeout) {
            Ok(timeout) => self.with_deadline(Utc::now() + timeout),
            Err(_) => self,
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataMap) -> Self {
        self.metadata = metadata;
        self
    }

    /// 设置调用级日志输出端，优先于拦截器构造时传入的输出端
    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// 距离截止时间的剩余时长，已过期时为零
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }

    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut MetadataMap {
        &mut self.metadata
    }

    pub fn logger(&self) -> Option<&SharedLogger> {
        self.logger.as_ref()
    }

    /// 解析本次调用使用的输出端：上下文 > 构造时传入 > 丢弃
    pub fn resolve_logger(&self, fallback: Option<&SharedLogger>) -> SharedLogger {
        self.logger
            .as_ref()
            .or(fallback)
            .cloned()
            .unwrap_or_else(|| Arc::new(NopLogger))
    }

    /// 把上下文写入客户端即将发出的请求
    ///
    /// metadata 逐项追加，截止时间转成 `grpc-timeout`，输出端放入 extensions。
    pub fn apply_to<T>(&self, request: &mut Request<T>) {
        for entry in self.metadata.iter() {
            match entry {
                KeyAndValueRef::Ascii(key, value) => {
                    if key.as_str() != GRPC_TIMEOUT_HEADER {
                        request.metadata_mut().append(key.clone(), value.clone());
                    }
                }
                KeyAndValueRef::Binary(key, value) => {
                    request.metadata_mut().append_bin(key.clone(), value.clone());
                }
            }
        }
        if let Some(remaining) = self.remaining() {
            request.set_timeout(remaining);
        }
        if let Some(logger) = &self.logger {
            request
                .extensions_mut()
                .insert(LoggerExtension(logger.clone()));
        }
    }
}

impl fmt::Debug for RpcContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcContext")
            .field("deadline", &self.deadline)
            .field("metadata", &self.metadata)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

/// 解析 `grpc-timeout` 头
///
/// 格式为最多 8 位数字加单位：`H` 时、`M` 分、`S` 秒、`m` 毫秒、`u` 微秒、`n` 纳秒。
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.len() < 2 || !value.is_ascii() {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    match unit {
        "H" => Some(Duration::from_secs(amount * 60 * 60)),
        "M" => Some(Duration::from_secs(amount * 60)),
        "S" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_millis(amount)),
        "u" => Some(Duration::from_micros(amount)),
        "n" => Some(Duration::from_nanos(amount)),
        _ => None,
    }
}
