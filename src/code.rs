//! gRPC 状态码名称
//!
//! `tonic::Code` 的 `Display` 输出的是描述文本，日志里需要的是规范名称
//! （`OK`、`Canceled`、`InvalidArgument` ...），这里提供双向转换。

use tonic::Code;

/// 全部标准状态码，按数值顺序排列
pub const ALL_CODES: [Code; 17] = [
    Code::Ok,
    Code::Cancelled,
    Code::Unknown,
    Code::InvalidArgument,
    Code::DeadlineExceeded,
    Code::NotFound,
    Code::AlreadyExists,
    Code::PermissionDenied,
    Code::ResourceExhausted,
    Code::FailedPrecondition,
    Code::Aborted,
    Code::OutOfRange,
    Code::Unimplemented,
    Code::Internal,
    Code::Unavailable,
    Code::DataLoss,
    Code::Unauthenticated,
];

/// 获取状态码的规范名称
pub fn code_name(code: Code) -> &'static str {
    match code {
        Code::Ok => "OK",
        Code::Cancelled => "Canceled",
        Code::Unknown => "Unknown",
        Code::InvalidArgument => "InvalidArgument",
        Code::DeadlineExceeded => "DeadlineExceeded",
        Code::NotFound => "NotFound",
        Code::AlreadyExists => "AlreadyExists",
        Code::PermissionDenied => "PermissionDenied",
        Code::ResourceExhausted => "ResourceExhausted",
        Code::FailedPrecondition => "FailedPrecondition",
        Code::Aborted => "Aborted",
        Code::OutOfRange => "OutOfRange",
        Code::Unimplemented => "Unimplemented",
        Code::Internal => "Internal",
        Code::Unavailable => "Unavailable",
        Code::DataLoss => "DataLoss",
        Code::Unauthenticated => "Unauthenticated",
    }
}

/// 从名称解析状态码
///
/// 接受规范名称（`DeadlineExceeded`）、大写下划线形式（`DEADLINE_EXCEEDED`）
/// 以及数值（`4`），大小写不敏感。
pub fn parse_code(name: &str) -> Option<Code> {
    let name = name.trim();
    if let Ok(value) = name.parse::<i32>() {
        return ALL_CODES.iter().copied().find(|code| *code as i32 == value);
    }

    let normalized: String = name
        .chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect();

    // "Cancelled" 和 "Canceled" 两种拼写都接受
    if normalized == "cancelled" {
        return Some(Code::Cancelled);
    }

    ALL_CODES
        .iter()
        .copied()
        .find(|code| code_name(*code).to_ascii_lowercase() == normalized)
}
