//! 流式调用句柄
//!
//! 传输层的流对象通过这两个 trait 暴露给拦截器。
//! `recv` 返回 `Ok(None)` 表示对端正常结束（EOF），它不是错误。

pub mod channel;

pub use channel::{ChannelClientStream, ChannelServerStream};

use crate::context::RpcContext;
use async_trait::async_trait;
use tonic::Status;
use tonic::metadata::MetadataMap;

/// 流描述
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamDesc {
    pub stream_name: String,
    pub client_streams: bool,
    pub server_streams: bool,
}

impl StreamDesc {
    pub fn new(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            client_streams: false,
            server_streams: false,
        }
    }

    /// 双向流
    pub fn bidirectional(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            client_streams: true,
            server_streams: true,
        }
    }
}

/// 服务端流信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamServerInfo {
    pub full_method: String,
    pub is_client_stream: bool,
    pub is_server_stream: bool,
}

impl StreamServerInfo {
    pub fn new(full_method: impl Into<String>) -> Self {
        Self {
            full_method: full_method.into(),
            is_client_stream: true,
            is_server_stream: true,
        }
    }
}

/// 客户端流
#[async_trait]
pub trait ClientStream: Send {
    type Request: Send + 'static;
    type Response: Send + 'static;

    fn context(&self) -> &RpcContext;

    /// 服务端返回的响应头
    fn header(&self) -> &MetadataMap;

    async fn send(&mut self, message: Self::Request) -> Result<(), Status>;

    async fn recv(&mut self) -> Result<Option<Self::Response>, Status>;

    /// 关闭发送方向，之后仍可继续接收
    async fn close_send(&mut self) -> Result<(), Status>;
}

/// 服务端流
#[async_trait]
pub trait ServerStream: Send {
    type Request: Send + 'static;
    type Response: Send + 'static;

    fn context(&self) -> &RpcContext;

    /// 设置响应头，随第一条消息或 `send_header` 一起发出
    fn set_header(&mut self, metadata: MetadataMap) -> Result<(), Status>;

    async fn send_header(&mut self, metadata: MetadataMap) -> Result<(), Status>;

    fn set_trailer(&mut self, metadata: MetadataMap);

    async fn send(&mut self, message: Self::Response) -> Result<(), Status>;

    async fn recv(&mut self) -> Result<Option<Self::Request>, Status>;
}
