//! 调用生命周期
//!
//! 四种拦截器共用的部分：构造调用上下文、输出开始记录，
//! 以及在正常返回或 panic 时输出唯一一条结束记录。

use crate::code::code_name;
use crate::context::RpcContext;
use crate::logger::{Level, LogContext, SharedLogger, Value, emit};
use crate::options::{
    CODE_KEY, DURATION_KEY, ERROR_KEY, ERROR_MESSAGE_KEY, KIND_KEY, Options, PANIC_KEY,
    feed_context,
};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::sync::Arc;
use std::time::Instant;
use tonic::Status;

/// 调用方还是被调用方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Client,
    Server,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Client => "client",
            Kind::Server => "server",
        }
    }
}

/// 一元调用还是流式调用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallType {
    Unary,
    Stream,
}

impl CallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallType::Unary => "unary",
            CallType::Stream => "stream",
        }
    }
}

/// 一次调用的生命周期状态
///
/// 结束记录只输出一次。未输出结束记录就被丢弃（调用 future 被取消、超时、
/// 对端断开）时，由 `Drop` 补记一条取消记录；若正处于 panic 展开中则补记 panic 记录。
pub(crate) struct Lifecycle {
    kind: Kind,
    call_type: CallType,
    method: String,
    start: Instant,
    options: Arc<Options>,
    logger: SharedLogger,
    context: LogContext,
    finished: bool,
}

impl Lifecycle {
    pub(crate) fn begin(
        kind: Kind,
        call_type: CallType,
        method: &str,
        ctx: &RpcContext,
        options: Arc<Options>,
        fallback: Option<&SharedLogger>,
    ) -> Self {
        let start = Instant::now();
        let logger = ctx.resolve_logger(fallback);
        let mut context = feed_context(options.context_for(method), ctx, method, chrono::Utc::now());
        context.add(KIND_KEY, kind.as_str());

        Self {
            kind,
            call_type,
            method: method.to_string(),
            start,
            options,
            logger,
            context,
            finished: false,
        }
    }

    pub(crate) fn logger(&self) -> &SharedLogger {
        &self.logger
    }

    pub(crate) fn options(&self) -> &Arc<Options> {
        &self.options
    }

    /// 当前上下文的快照，交给流包装器独立使用
    pub(crate) fn snapshot(&self) -> LogContext {
        self.context.clone()
    }

    /// 流式调用的开始记录
    pub(crate) fn log_begin(&self) {
        emit(
            self.logger.as_ref(),
            &format!("grpc {} begin stream call {}", self.kind.as_str(), self.method),
            Level::Debug,
            &self.context,
        );
    }

    /// 正常结束：按状态码分级输出结束记录
    pub(crate) fn finish<T>(self, result: &Result<T, Status>) {
        self.finish_with(result.as_ref().err());
    }

    pub(crate) fn finish_with(mut self, error: Option<&Status>) {
        self.complete(error);
    }

    /// 异常结束：输出 critical 记录，由调用方继续抛出 panic
    pub(crate) fn panicked(mut self, payload: &(dyn Any + Send)) {
        self.abort(payload);
    }

    fn complete(&mut self, error: Option<&Status>) {
        if std::mem::replace(&mut self.finished, true) {
            return;
        }
        let duration = self.start.elapsed();
        self.context.add(DURATION_KEY, duration.as_secs_f64());

        let code = match error {
            Some(status) => self.options.code_for(status),
            None => tonic::Code::Ok,
        };
        let code_str = code_name(code);
        self.context.add(CODE_KEY, code_str);
        if let Some(status) = error {
            self.context
                .add(ERROR_KEY, Value::payload(status.clone()))
                .add(ERROR_MESSAGE_KEY, status.message());
        }

        emit(
            self.logger.as_ref(),
            &format!(
                "grpc {} {} call {} [code:{}, duration:{:?}]",
                self.kind.as_str(),
                self.call_type.as_str(),
                self.method,
                code_str,
                duration
            ),
            self.options.level_for(code),
            &self.context,
        );
    }

    fn abort(&mut self, payload: &(dyn Any + Send)) {
        if std::mem::replace(&mut self.finished, true) {
            return;
        }
        let duration = self.start.elapsed();
        self.context
            .add(DURATION_KEY, duration.as_secs_f64())
            .add(PANIC_KEY, panic_message(payload));

        emit(
            self.logger.as_ref(),
            &format!(
                "grpc {} {} panic {} [duration:{:?}]",
                self.kind.as_str(),
                self.call_type.as_str(),
                self.method,
                duration
            ),
            Level::Critical,
            &self.context,
        );
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if std::thread::panicking() {
            self.abort(&"call dropped while panicking");
        } else {
            self.complete(Some(&Status::cancelled("call dropped before completion")));
        }
    }
}

/// 执行被包装的调用，并在所有退出路径上输出结束记录
///
/// panic 会在记录之后原样继续抛出。
pub(crate) async fn observe<T, Fut>(lifecycle: Lifecycle, call: Fut) -> Result<T, Status>
where
    Fut: Future<Output = Result<T, Status>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => {
            lifecycle.finish(&result);
            result
        }
        Err(payload) => {
            lifecycle.panicked(payload.as_ref());
            resume_unwind(payload)
        }
    }
}

/// 提取 panic 负载中的文本
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
