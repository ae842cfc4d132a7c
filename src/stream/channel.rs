//! 基于 channel 的流适配器
//!
//! tonic 的流式调用由一个入站 `Stream<Item = Result<T, Status>>`（例如 `tonic::Streaming<T>`）
//! 和一个出站 channel 组成，这里把两者组合成 [`ClientStream`] / [`ServerStream`]。

use super::{ClientStream, ServerStream};
use crate::context::RpcContext;
use async_trait::async_trait;
use futures::{TryStream, TryStreamExt};
use tokio::sync::mpsc;
use tonic::metadata::MetadataMap;
use tonic::{Request, Response, Status};

/// 客户端流适配器
///
/// 出站消息写入 `outgoing`（通常用 `ReceiverStream` 包装后交给 tonic 客户端），
/// 入站消息从 `incoming` 读取。
pub struct ChannelClientStream<Req, In> {
    context: RpcContext,
    header: MetadataMap,
    outgoing: Option<mpsc::Sender<Req>>,
    incoming: In,
}

impl<Req, In> ChannelClientStream<Req, In> {
    pub fn new(context: RpcContext, outgoing: mpsc::Sender<Req>, incoming: In) -> Self {
        Self {
            context,
            header: MetadataMap::new(),
            outgoing: Some(outgoing),
            incoming,
        }
    }

    /// 从 tonic 客户端返回的响应构造，响应 metadata 作为响应头
    pub fn from_response(
        context: RpcContext,
        outgoing: mpsc::Sender<Req>,
        response: Response<In>,
    ) -> Self {
        let (header, incoming, _) = response.into_parts();
        Self {
            context,
            header,
            outgoing: Some(outgoing),
            incoming,
        }
    }
}

#[async_trait]
impl<Req, In> ClientStream for ChannelClientStream<Req, In>
where
    Req: Send + 'static,
    In: TryStream<Error = Status> + Unpin + Send,
    In::Ok: Send + 'static,
{
    type Request = Req;
    type Response = In::Ok;

    fn context(&self) -> &RpcContext {
        &self.context
    }

    fn header(&self) -> &MetadataMap {
        &self.header
    }

    async fn send(&mut self, message: Req) -> Result<(), Status> {
        let outgoing = self
            .outgoing
            .as_ref()
            .ok_or_else(|| Status::failed_precondition("send after close_send"))?;
        outgoing
            .send(message)
            .await
            .map_err(|_| Status::unavailable("request stream closed"))
    }

    async fn recv(&mut self) -> Result<Option<In::Ok>, Status> {
        self.incoming.try_next().await
    }

    async fn close_send(&mut self) -> Result<(), Status> {
        self.outgoing.take();
        Ok(())
    }
}

/// 服务端流适配器
///
/// 入站消息从 `incoming` 读取，出站消息写入 `outgoing`
/// （通常用 `ReceiverStream` 包装后作为 tonic 的响应流返回）。
pub struct ChannelServerStream<In, Resp> {
    context: RpcContext,
    incoming: In,
    outgoing: mpsc::Sender<Result<Resp, Status>>,
    header: MetadataMap,
    header_sent: bool,
    trailer: MetadataMap,
}

impl<In, Resp> ChannelServerStream<In, Resp> {
    pub fn new(
        context: RpcContext,
        incoming: In,
        outgoing: mpsc::Sender<Result<Resp, Status>>,
    ) -> Self {
        Self {
            context,
            incoming,
            outgoing,
            header: MetadataMap::new(),
            header_sent: false,
            trailer: MetadataMap::new(),
        }
    }

    /// 从 tonic 服务端收到的请求构造
    pub fn from_request(request: Request<In>, outgoing: mpsc::Sender<Result<Resp, Status>>) -> Self {
        let context = RpcContext::from_request(&request);
        Self::new(context, request.into_inner(), outgoing)
    }

    /// 已设置的响应头，用于构造 `tonic::Response`
    pub fn header(&self) -> &MetadataMap {
        &self.header
    }

    pub fn header_sent(&self) -> bool {
        self.header_sent
    }

    pub fn trailer(&self) -> &MetadataMap {
        &self.trailer
    }
}

#[async_trait]
impl<In, Resp> ServerStream for ChannelServerStream<In, Resp>
where
    In: TryStream<Error = Status> + Unpin + Send,
    In::Ok: Send + 'static,
    Resp: Send + 'static,
{
    type Request = In::Ok;
    type Response = Resp;

    fn context(&self) -> &RpcContext {
        &self.context
    }

    fn set_header(&mut self, metadata: MetadataMap) -> Result<(), Status> {
        if self.header_sent {
            return Err(Status::internal("header already sent"));
        }
        merge_metadata(&mut self.header, metadata);
        Ok(())
    }

    async fn send_header(&mut self, metadata: MetadataMap) -> Result<(), Status> {
        self.set_header(metadata)?;
        self.header_sent = true;
        Ok(())
    }

    fn set_trailer(&mut self, metadata: MetadataMap) {
        merge_metadata(&mut self.trailer, metadata);
    }

    async fn send(&mut self, message: Resp) -> Result<(), Status> {
        self.header_sent = true;
        self.outgoing
            .send(Ok(message))
            .await
            .map_err(|_| Status::cancelled("response stream closed"))
    }

    async fn recv(&mut self) -> Result<Option<In::Ok>, Status> {
        self.incoming.try_next().await
    }
}

fn merge_metadata(target: &mut MetadataMap, source: MetadataMap) {
    let mut headers = std::mem::take(target).into_headers();
    headers.extend(source.into_headers());
    *target = MetadataMap::from_headers(headers);
}
