//! gRPC 日志拦截器模块
//!
//! 客户端和服务端各有一元与流式两种拦截器，共用同一套生命周期逻辑：
//! 开始时构造日志上下文，结束时按状态码分级输出一条记录，panic 时输出 critical 记录后继续抛出。

pub mod client;
pub mod lifecycle;
pub mod server;
mod stream_log;

pub use client::{ClientStreamWrapper, StreamInterceptor as ClientStreamInterceptor};
pub use client::UnaryInterceptor as ClientUnaryInterceptor;
pub use lifecycle::{CallType, Kind};
pub use server::{ServerStreamWrapper, StreamInterceptor as ServerStreamInterceptor};
pub use server::UnaryInterceptor as ServerUnaryInterceptor;

use crate::logger::SharedLogger;
use crate::options::{LogOption, Options};
use std::sync::Arc;

/// 拦截器共用的配置：构造时传入的输出端和解析后的选项
#[derive(Clone)]
pub(crate) struct Base {
    logger: Option<SharedLogger>,
    options: Arc<Options>,
}

impl Base {
    pub(crate) fn new<I>(logger: Option<SharedLogger>, options: I) -> Self
    where
        I: IntoIterator<Item = LogOption>,
    {
        Self {
            logger,
            options: Arc::new(Options::evaluate(options)),
        }
    }

    pub(crate) fn logger(&self) -> Option<&SharedLogger> {
        self.logger.as_ref()
    }

    pub(crate) fn options(&self) -> Arc<Options> {
        self.options.clone()
    }
}
