//! 测试公共设施
//!
//! 提供测试消息类型、可编排的客户端流以及常用断言。

#![allow(dead_code)]

use async_trait::async_trait;
use flare_grpc_logger::{ClientStream, Entry, LogContext, LogError, Logger, Level, RpcContext};
use std::collections::VecDeque;
use std::time::Duration;
use tonic::Status;
use tonic::metadata::MetadataMap;

pub const SERVICE: &str = "mwitkow.testproto.TestService";
pub const PING: &str = "/mwitkow.testproto.TestService/Ping";
pub const PING_ERROR: &str = "/mwitkow.testproto.TestService/PingError";
pub const PING_STREAM: &str = "/mwitkow.testproto.TestService/PingStream";

#[derive(Debug, Clone, PartialEq)]
pub struct PingRequest {
    pub value: String,
}

impl PingRequest {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PingResponse {
    pub value: String,
    pub counter: i32,
}

/// 带两秒超时的调用上下文
pub fn simple_ctx() -> RpcContext {
    RpcContext::new().with_timeout(Duration::from_secs(2))
}

/// 一元 Ping：原样返回请求值
pub async fn ping(_ctx: RpcContext, request: PingRequest) -> Result<PingResponse, Status> {
    Ok(PingResponse {
        value: request.value,
        counter: 42,
    })
}

/// 回显客户端流：每次发送的消息都会作为一条响应排队
pub struct EchoClientStream {
    context: RpcContext,
    header: MetadataMap,
    queue: VecDeque<PingResponse>,
    closed: bool,
    pub fail_send: Option<Status>,
    pub fail_recv: Option<Status>,
    pub panic_on_recv: bool,
}

impl EchoClientStream {
    pub fn new(context: RpcContext) -> Self {
        Self {
            context,
            header: MetadataMap::new(),
            queue: VecDeque::new(),
            closed: false,
            fail_send: None,
            fail_recv: None,
            panic_on_recv: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl ClientStream for EchoClientStream {
    type Request = PingRequest;
    type Response = PingResponse;

    fn context(&self) -> &RpcContext {
        &self.context
    }

    fn header(&self) -> &MetadataMap {
        &self.header
    }

    async fn send(&mut self, message: PingRequest) -> Result<(), Status> {
        if let Some(status) = self.fail_send.clone() {
            return Err(status);
        }
        self.queue.push_back(PingResponse {
            value: message.value,
            counter: 0,
        });
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<PingResponse>, Status> {
        if self.panic_on_recv {
            panic!("recv exploded");
        }
        if let Some(status) = self.fail_recv.take() {
            return Err(status);
        }
        Ok(self.queue.pop_front())
    }

    async fn close_send(&mut self) -> Result<(), Status> {
        self.closed = true;
        Ok(())
    }
}

/// 总是失败的输出端
pub struct FailingLogger;

impl Logger for FailingLogger {
    fn log(&self, _message: &str, _level: Level, _context: &LogContext) -> Result<(), LogError> {
        Err(LogError::unavailable("sink is down"))
    }
}

pub fn str_field<'a>(entry: &'a Entry, key: &str) -> Option<&'a str> {
    entry.context.get(key).and_then(|v| v.as_str())
}

/// 每条记录都应带有的基础字段
pub fn assert_base_fields(entry: &Entry, kind: &str, method: &str) {
    assert_eq!(str_field(entry, "grpc_kind"), Some(kind), "{}", entry.message);
    assert_eq!(str_field(entry, "grpc_service"), Some(SERVICE), "{}", entry.message);
    assert_eq!(str_field(entry, "grpc_method"), Some(method), "{}", entry.message);
    assert!(entry.context.contains_key("grpc_start_time"), "{}", entry.message);
    assert!(entry.context.contains_key("grpc_request_deadline"), "{}", entry.message);
}
