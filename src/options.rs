//! 拦截器选项
//!
//! 三个可覆盖的行为：日志上下文种子、错误到状态码的映射、状态码到日志级别的映射。
//! 每个拦截器在构造时解析一次，之后只读共享。

use crate::code::code_name;
use crate::context::RpcContext;
use crate::logger::{Level, LogContext};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::sync::Arc;
use tonic::{Code, Status};

// ============================================================
// 上下文字段名
// ============================================================

pub const SERVICE_KEY: &str = "grpc_service";
pub const METHOD_KEY: &str = "grpc_method";
pub const START_TIME_KEY: &str = "grpc_start_time";
pub const DEADLINE_KEY: &str = "grpc_request_deadline";
pub const KIND_KEY: &str = "grpc_kind";
pub const DURATION_KEY: &str = "grpc_duration";
pub const CODE_KEY: &str = "grpc_code";
pub const ERROR_KEY: &str = "grpc_error";
pub const ERROR_MESSAGE_KEY: &str = "grpc_error_message";
pub const PANIC_KEY: &str = "grpc_panic";
pub const SEND_DATA_KEY: &str = "grpc_send_data";
pub const RECV_DATA_KEY: &str = "grpc_recv_data";
pub const METADATA_KEY: &str = "grpc_metadata";

/// 按方法全名提供额外的日志上下文
pub type LoggerContextProvider = Arc<dyn Fn(&str) -> Option<LogContext> + Send + Sync>;

/// 状态码到日志级别的映射
pub type CodeToLevel = Arc<dyn Fn(Code) -> Level + Send + Sync>;

/// 错误到状态码的映射
pub type ErrorToCode = Arc<dyn Fn(&Status) -> Code + Send + Sync>;

/// 默认的状态码到日志级别映射
pub fn default_code_to_level(code: Code) -> Level {
    match code {
        Code::Ok | Code::Cancelled | Code::NotFound | Code::AlreadyExists => Level::Info,
        Code::InvalidArgument | Code::PermissionDenied | Code::Unauthenticated => Level::Notice,
        Code::DeadlineExceeded
        | Code::ResourceExhausted
        | Code::FailedPrecondition
        | Code::Aborted
        | Code::OutOfRange
        | Code::Unavailable => Level::Warning,
        // Unknown, Unimplemented, Internal, DataLoss
        _ => Level::Error,
    }
}

/// 默认的错误到状态码映射：直接取 `Status` 自带的状态码
pub fn default_error_to_code(status: &Status) -> Code {
    status.code()
}

/// 单个覆盖项，按顺序应用，后者覆盖前者
#[derive(Clone)]
pub enum LogOption {
    LoggerContext(LoggerContextProvider),
    Levels(CodeToLevel),
    Codes(ErrorToCode),
}

/// 覆盖日志上下文种子
pub fn with_logger_context<F>(f: F) -> LogOption
where
    F: Fn(&str) -> Option<LogContext> + Send + Sync + 'static,
{
    LogOption::LoggerContext(Arc::new(f))
}

/// 覆盖状态码到日志级别的映射
pub fn with_levels<F>(f: F) -> LogOption
where
    F: Fn(Code) -> Level + Send + Sync + 'static,
{
    LogOption::Levels(Arc::new(f))
}

/// 覆盖错误到状态码的映射
pub fn with_codes<F>(f: F) -> LogOption
where
    F: Fn(&Status) -> Code + Send + Sync + 'static,
{
    LogOption::Codes(Arc::new(f))
}

/// 解析后的选项
#[derive(Clone)]
pub struct Options {
    context_provider: LoggerContextProvider,
    level_fn: CodeToLevel,
    code_fn: ErrorToCode,
}

impl Options {
    /// 从默认值开始依次应用覆盖项
    pub fn evaluate<I>(options: I) -> Self
    where
        I: IntoIterator<Item = LogOption>,
    {
        let mut resolved = Self::default();
        for option in options {
            match option {
                LogOption::LoggerContext(f) => resolved.context_provider = f,
                LogOption::Levels(f) => resolved.level_fn = f,
                LogOption::Codes(f) => resolved.code_fn = f,
            }
        }
        resolved
    }

    /// 方法对应的额外上下文
    pub fn context_for(&self, full_method: &str) -> Option<LogContext> {
        (self.context_provider)(full_method)
    }

    /// 状态码对应的日志级别
    pub fn level_for(&self, code: Code) -> Level {
        (self.level_fn)(code)
    }

    /// 错误对应的状态码
    pub fn code_for(&self, status: &Status) -> Code {
        (self.code_fn)(status)
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            context_provider: Arc::new(|_| None),
            level_fn: Arc::new(default_code_to_level),
            code_fn: Arc::new(default_error_to_code),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options").finish_non_exhaustive()
    }
}

/// 拆分方法全名
///
/// `/pkg.Service/Method` 拆成 `("pkg.Service", "Method")`；没有 `/` 时服务名为空。
pub fn split_method(full_method: &str) -> (&str, &str) {
    let trimmed = full_method.strip_prefix('/').unwrap_or(full_method);
    match trimmed.rsplit_once('/') {
        Some((service, method)) => (service, method),
        None => ("", trimmed),
    }
}

/// 构造调用的基础日志上下文
///
/// 在种子上下文（没有则新建）之上写入服务名、方法名、开始时间以及截止时间。
pub fn feed_context(
    seed: Option<LogContext>,
    ctx: &RpcContext,
    full_method: &str,
    start_time: DateTime<Utc>,
) -> LogContext {
    let mut context = seed.unwrap_or_default();
    let (service, method) = split_method(full_method);
    context
        .add(SERVICE_KEY, service)
        .add(METHOD_KEY, method)
        .add(START_TIME_KEY, format_time(start_time));

    if let Some(deadline) = ctx.deadline() {
        context.add(DEADLINE_KEY, format_time(deadline));
    }
    context
}

/// 把错误相关字段写入上下文
pub(crate) fn add_error_fields(context: &mut LogContext, status: &Status, code: Code) {
    context
        .add(ERROR_KEY, crate::logger::Value::payload(status.clone()))
        .add(ERROR_MESSAGE_KEY, status.message())
        .add(CODE_KEY, code_name(code));
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}
