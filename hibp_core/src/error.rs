//! 错误类型定义

use std::time::Duration;

use thiserror::Error;

use crate::request::Endpoint;

/// 429 响应缺少可用 `Retry-After` 时的默认等待秒数
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 2;

/// 错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// 参数错误（摘要长度、路径参数、请求头等）
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 需要 API Key 的端点未配置 Key（客户端配置错误，不会发出无 Key 请求）
    #[error("Endpoint {endpoint:?} requires an API key but none is configured")]
    MissingApiKey { endpoint: Endpoint },

    /// 400
    #[error("Bad request: the parameter does not comply with an acceptable format")]
    BadRequest,

    /// 401
    #[error("Unauthorised: either no API key was provided or it wasn't valid")]
    Unauthorised,

    /// 403
    #[error("Forbidden: no user agent has been specified in the request")]
    Forbidden,

    /// 404
    #[error("Not found")]
    NotFound,

    /// 429，`retry_after` 为服务端建议的等待秒数
    #[error("Too many requests: retry after {retry_after} seconds")]
    TooManyRequests { retry_after: u64 },

    /// 503
    #[error("Service unavailable")]
    ServiceUnavailable,

    /// 未归类的 HTTP 状态码
    #[error("Unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    /// 响应体与端点预期的格式不符
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// 网络/传输层错误
    #[error("Transport error: {0}")]
    Transport(String),
}

impl Error {
    /// 限流时服务端建议的等待时长
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::TooManyRequests { retry_after } => Some(Duration::from_secs(*retry_after)),
            _ => None,
        }
    }

    /// 是否为服务端返回的状态错误
    pub fn is_status(&self) -> bool {
        matches!(
            self,
            Error::BadRequest
                | Error::Unauthorised
                | Error::Forbidden
                | Error::NotFound
                | Error::TooManyRequests { .. }
                | Error::ServiceUnavailable
                | Error::UnexpectedStatus(_)
        )
    }
}

/// 结果类型
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after() {
        let err = Error::TooManyRequests { retry_after: 5 };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
        assert!(err.is_status());

        assert_eq!(Error::NotFound.retry_after(), None);
        assert!(!Error::Transport("timeout".to_string()).is_status());
    }

    #[test]
    fn test_missing_api_key_message() {
        let err = Error::MissingApiKey { endpoint: Endpoint::PasteAccount };
        assert!(err.to_string().contains("PasteAccount"));
        assert!(!err.is_status());
    }
}
