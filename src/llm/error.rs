//! 生成器边界的结构化错误
//!
//! 是否可重试由 `retryable` 字段显式携带，重试层不再解析错误文本。

use std::fmt;

use thiserror::Error;

/// 错误类别
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// 限流 / 容量暂时不足
    RateLimited,
    /// 请求失败（网络、鉴权、服务端拒绝等）
    Request,
    /// 超时
    Timeout,
    /// 响应无法解析或缺少必需字段
    Malformed,
    /// 后端不可用（未配置、脚本耗尽等）
    Unavailable,
}

impl fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LlmErrorKind::RateLimited => "rate limited",
            LlmErrorKind::Request => "request failed",
            LlmErrorKind::Timeout => "timed out",
            LlmErrorKind::Malformed => "malformed response",
            LlmErrorKind::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    /// 限流错误：唯一默认可重试的类别
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::RateLimited, message, true)
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Request, message, false)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Timeout, message, false)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Malformed, message, false)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unavailable, message, false)
    }

    /// 根据 HTTP 状态码归类：429 / 503 视为容量不足
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            429 | 503 => Self::rate_limited(format!("HTTP {status}: {}", body.into())),
            _ => Self::request(format!("HTTP {status}: {}", body.into())),
        }
    }
}
