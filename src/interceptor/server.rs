//! 服务端拦截器
//!
//! 记录服务端处理的 gRPC 调用。

use super::Base;
use super::lifecycle::{CallType, Kind, Lifecycle, observe};
use super::stream_log::StreamLog;
use crate::context::RpcContext;
use crate::logger::{SharedLogger, Value};
use crate::options::LogOption;
use crate::stream::{ServerStream, StreamServerInfo};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::time::Instant;
use tonic::Status;
use tonic::metadata::MetadataMap;

/// 服务端一元调用拦截器
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

    pub fn without_logger<I>(options: I) -> Self
    where
        I: IntoIterator<Item = LogOption>,
    {
        Self {
            base: Base::new(None, options),
        }
    }

    /// 执行一次一元处理并记录结果
    pub async fn intercept<Req, Resp, F, Fut>(
        &self,
        ctx: RpcContext,
        full_method: &str,
        request: Req,
        handler: F,
    ) -> Result<Resp, Status>
    where
        F: FnOnce(RpcContext, Req) -> Fut,
        Fut: Future<Output = Result<Resp, Status>>,
    {
        let lifecycle = Lifecycle::begin(
            Kind::Server,
            CallType::Unary,
            full_method,
            &ctx,
            self.base.options(),
            self.base.logger(),
        );
        observe(lifecycle, async move { handler(ctx, request).await }).await
    }
}

/// 服务端流式调用拦截器
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

    /// 用包装后的流执行处理函数并记录结果
    ///
    /// 上下文取自流本身，处理函数拿到的始终是 [`ServerStreamWrapper`]。
    pub async fn intercept<S, T, F, Fut>(
        &self,
        stream: S,
        info: &StreamServerInfo,
        handler: F,
    ) -> Result<T, Status>
    where
        S: ServerStream,
        F: FnOnce(ServerStreamWrapper<S>) -> Fut,
        Fut: Future<Output = Result<T, Status>>,
    {
        let ctx = stream.context().clone();
        let lifecycle = Lifecycle::begin(
            Kind::Server,
            CallType::Stream,
            &info.full_method,
            &ctx,
            self.base.options(),
            self.base.logger(),
        );
        lifecycle.log_begin();

        let wrapped = ServerStreamWrapper {
            inner: stream,
            context: ctx,
            log: StreamLog::new(Kind::Server, &lifecycle),
        };
        observe(lifecycle, async move { handler(wrapped).await }).await
    }
}

/// 服务端流包装器
///
/// 记录 `send` / `recv` / `send_header`，`context` 返回包装时捕获的上下文，
/// 其余操作直接转发。
pub struct ServerStreamWrapper<S> {
    inner: S,
    context: RpcContext,
    log: StreamLog,
}

#[async_trait]
impl<S> ServerStream for ServerStreamWrapper<S>
where
    S: ServerStream,
    S::Request: Clone + fmt::Debug + Sync,
    S::Response: Clone + fmt::Debug + Sync,
{
    type Request = S::Request;
    type Response = S::Response;

    fn context(&self) -> &RpcContext {
        &self.context
    }

    fn set_header(&mut self, metadata: MetadataMap) -> Result<(), Status> {
        self.inner.set_header(metadata)
    }

    async fn send_header(&mut self, metadata: MetadataMap) -> Result<(), Status> {
        let result = self.inner.send_header(metadata.clone()).await;
        self.log.header_sent(metadata, &result);
        result
    }

    fn set_trailer(&mut self, metadata: MetadataMap) {
        self.inner.set_trailer(metadata)
    }

    async fn send(&mut self, message: S::Response) -> Result<(), Status> {
        let payload = Value::payload(message.clone());
        let start = Instant::now();
        let result = self.inner.send(message).await;
        self.log.sent(payload, start.elapsed(), &result);
        result
    }

    async fn recv(&mut self) -> Result<Option<S::Request>, Status> {
        let start = Instant::now();
        let result = self.inner.recv().await;
        self.log.received(start.elapsed(), &result);
        result
    }
}
