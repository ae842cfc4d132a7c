//! Flare gRPC Logger
//!
//! Structured call-lifecycle logging for gRPC: unary and streaming interceptors for client
//! and server, stream wrappers that log every send/receive, and an overridable policy that maps
//! status codes to log levels.

pub mod code;
pub mod config;
pub mod context;
pub mod error;
pub mod interceptor;
pub mod logger;
pub mod options;
pub mod stream;

// Re-exports
pub use code::{code_name, parse_code};
pub use config::LoggerConfig;
pub use context::RpcContext;
pub use error::{ConfigError, LogError};
pub use interceptor::{
    CallType, ClientStreamInterceptor, ClientStreamWrapper, ClientUnaryInterceptor, Kind,
    ServerStreamInterceptor, ServerStreamWrapper, ServerUnaryInterceptor,
};
pub use logger::{
    Entry, Level, LogContext, Logger, LoggerExtension, MemoryLogger, NopLogger, SharedLogger,
    TracingLogger, Value,
};
pub use options::{
    LogOption, Options, default_code_to_level, default_error_to_code, with_codes, with_levels,
    with_logger_context,
};
pub use stream::{
    ChannelClientStream, ChannelServerStream, ClientStream, ServerStream, StreamDesc,
    StreamServerInfo,
};
