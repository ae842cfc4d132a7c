//! 错误类型
//!
//! 拦截器本身从不产生新的调用错误：调用结果始终是传输层返回的 `tonic::Status`。
//! 这里只定义日志输出端和配置加载两类错误。

use thiserror::Error;

/// 日志输出端错误
///
/// 拦截器会丢弃这类错误，日志失败不能影响被观测的调用。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    #[error("log sink unavailable: {0}")]
    Unavailable(String),

    #[error("log record rejected: {0}")]
    Rejected(String),
}

impl LogError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        LogError::Unavailable(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        LogError::Rejected(msg.into())
    }
}

/// 配置加载错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown status code name: {0}")]
    UnknownCode(String),

    #[error("unknown log level: {0}")]
    UnknownLevel(String),
}

/// 配置相关的结果类型
pub type Result<T> = std::result::Result<T, ConfigError>;
