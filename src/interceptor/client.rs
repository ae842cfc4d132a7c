//! 客户端拦截器
//!
//! 记录对外发起的 gRPC 调用。

use super::Base;
use super::lifecycle::{CallType, Kind, Lifecycle, observe};
use super::stream_log::StreamLog;
use crate::context::RpcContext;
use crate::logger::{SharedLogger, Value};
use crate::options::LogOption;
use crate::stream::{ClientStream, StreamDesc};
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::time::Instant;
use tonic::Status;
use tonic::metadata::MetadataMap;

/// 客户端一元调用拦截器
#[derive(Clone)]
pub struct UnaryInterceptor {
    base: Base,
}

impl UnaryInterceptor {
    pub fn new<I>(logger: SharedLogger, options: I) -> Self
    where
        I: IntoIterator<Item = LogOption>,
    {
        Self {
            base: Base::new(Some(logger), options),
        }
    }

    /// 不指定输出端：只使用调用上下文里的输出端，没有则丢弃
    pub fn without_logger<I>(options: I) -> Self
    where
        I: IntoIterator<Item = LogOption>,
    {
        Self {
            base: Base::new(None, options),
        }
    }

    /// 执行一次一元调用并记录结果
    ///
    /// `invoker` 的返回值原样返回。
    pub async fn intercept<Req, Resp, F, Fut>(
        &self,
        ctx: RpcContext,
        method: &str,
        request: Req,
        invoker: F,
    ) -> Result<Resp, Status>
    where
        F: FnOnce(RpcContext, Req) -> Fut,
        Fut: Future<Output = Result<Resp, Status>>,
    {
        let lifecycle = Lifecycle::begin(
            Kind::Client,
            CallType::Unary,
            method,
            &ctx,
            self.base.options(),
            self.base.logger(),
        );
        observe(lifecycle, async move { invoker(ctx, request).await }).await
    }
}

/// 客户端流式调用拦截器
#[derive(Clone)]
pub struct StreamInterceptor {
    base: Base,
}

impl StreamInterceptor {
    pub fn new<I>(logger: SharedLogger, options: I) -> Self
    where
        I: IntoIterator<Item = LogOption>,
    {
        Self {
            base: Base::new(Some(logger), options),
        }
    }

    pub fn without_logger<I>(options: I) -> Self
    where
        I: IntoIterator<Item = LogOption>,
    {
        Self {
            base: Base::new(None, options),
        }
    }

    /// 建立流并返回包装后的流
    ///
    /// 建流失败或 panic 时立即输出结束记录；建流成功时，
    /// 结束记录由返回的 [`ClientStreamWrapper`] 在流结束时输出。
    pub async fn intercept<S, F, Fut>(
        &self,
        ctx: RpcContext,
        desc: &StreamDesc,
        method: &str,
        streamer: F,
    ) -> Result<ClientStreamWrapper<S>, Status>
    where
        S: ClientStream,
        F: FnOnce(RpcContext, StreamDesc) -> Fut,
        Fut: Future<Output = Result<S, Status>>,
    {
        let lifecycle = Lifecycle::begin(
            Kind::Client,
            CallType::Stream,
            method,
            &ctx,
            self.base.options(),
            self.base.logger(),
        );
        lifecycle.log_begin();

        let desc = desc.clone();
        let outcome = AssertUnwindSafe(async move { streamer(ctx, desc).await })
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(stream)) => Ok(ClientStreamWrapper::new(stream, lifecycle)),
            Ok(Err(status)) => {
                lifecycle.finish_with(Some(&status));
                Err(status)
            }
            Err(payload) => {
                lifecycle.panicked(payload.as_ref());
                resume_unwind(payload)
            }
        }
    }
}

/// 客户端流包装器
///
/// 独占内部流，记录每次 `send` / `recv`，其余操作直接转发。
/// 流结束（读到 EOF 或接收出错）时输出整个调用的结束记录；
/// 在此之前被丢弃时记为调用方取消。
pub struct ClientStreamWrapper<S> {
    inner: S,
    log: StreamLog,
    lifecycle: Option<Lifecycle>,
}

impl<S> ClientStreamWrapper<S> {
    pub(crate) fn new(inner: S, lifecycle: Lifecycle) -> Self {
        Self {
            inner,
            log: StreamLog::new(Kind::Client, &lifecycle),
            lifecycle: Some(lifecycle),
        }
    }

    /// 调用是否已经输出结束记录
    pub fn is_finished(&self) -> bool {
        self.lifecycle.is_none()
    }

    fn complete(&mut self, error: Option<&Status>) {
        if let Some(lifecycle) = self.lifecycle.take() {
            lifecycle.finish_with(error);
        }
    }

    fn abort(&mut self, payload: Box<dyn Any + Send>) -> ! {
        if let Some(lifecycle) = self.lifecycle.take() {
            lifecycle.panicked(payload.as_ref());
        }
        resume_unwind(payload)
    }
}

#[async_trait]
impl<S> ClientStream for ClientStreamWrapper<S>
where
    S: ClientStream,
    S::Request: Clone + fmt::Debug + Sync,
    S::Response: Clone + fmt::Debug + Sync,
{
    type Request = S::Request;
    type Response = S::Response;

    fn context(&self) -> &RpcContext {
        self.inner.context()
    }

    fn header(&self) -> &MetadataMap {
        self.inner.header()
    }

    async fn send(&mut self, message: S::Request) -> Result<(), Status> {
        let payload = Value::payload(message.clone());
        let start = Instant::now();
        let outcome = AssertUnwindSafe(self.inner.send(message)).catch_unwind().await;
        let result = match outcome {
            Ok(result) => result,
            Err(panic) => self.abort(panic),
        };
        self.log.sent(payload, start.elapsed(), &result);
        result
    }

    async fn recv(&mut self) -> Result<Option<S::Response>, Status> {
        let start = Instant::now();
        let outcome = AssertUnwindSafe(self.inner.recv()).catch_unwind().await;
        let result = match outcome {
            Ok(result) => result,
            Err(panic) => self.abort(panic),
        };
        self.log.received(start.elapsed(), &result);

        match &result {
            Ok(None) => self.complete(None),
            Err(status) => self.complete(Some(status)),
            Ok(Some(_)) => {}
        }
        result
    }

    async fn close_send(&mut self) -> Result<(), Status> {
        self.inner.close_send().await
    }
}
