//! 响应路由
//!
//! 根据 HTTP 状态码和发起请求的端点，把原始响应转换为类型化结果。

use crate::error::{Error, Result, DEFAULT_RETRY_AFTER_SECS};
use crate::protocol::KAnonymity;
use crate::request::Endpoint;
use crate::types::{ApiResponse, Breach, Paste, TruncatedBreach};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::de::DeserializeOwned;

/// 传输层返回的原始响应
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// 响应路由器
pub struct ResponseRouter;

impl ResponseRouter {
    /// 路由原始响应
    pub fn route_raw(endpoint: Endpoint, response: &RawResponse) -> Result<ApiResponse> {
        Self::route(endpoint, response.status, &response.headers, &response.body)
    }

    /// 按状态码分流，200 时交给端点对应的解析器
    pub fn route(
        endpoint: Endpoint,
        status: u16,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<ApiResponse> {
        match status {
            200 => Self::parse_body(endpoint, body),
            400 => Err(Error::BadRequest),
            401 => Err(Error::Unauthorised),
            403 => Err(Error::Forbidden),
            404 => Err(Error::NotFound),
            429 => Err(Error::TooManyRequests {
                retry_after: retry_after_secs(headers),
            }),
            503 => Err(Error::ServiceUnavailable),
            other => Err(Error::UnexpectedStatus(other)),
        }
    }

    /// 解析 200 响应体
    pub fn parse_body(endpoint: Endpoint, body: &[u8]) -> Result<ApiResponse> {
        match endpoint {
            Endpoint::BreachedAccount => Self::parse_breached_account(body),
            Endpoint::Breaches => decode::<Vec<Breach>>(body).map(ApiResponse::Breaches),
            Endpoint::Breach => decode::<Breach>(body).map(ApiResponse::Breach),
            Endpoint::DataClasses => decode::<Vec<String>>(body).map(ApiResponse::DataClasses),
            Endpoint::PasteAccount => decode::<Vec<Paste>>(body).map(ApiResponse::Pastes),
            Endpoint::PasswordRange => KAnonymity::parse_range(body).map(ApiResponse::PasswordRange),
        }
    }

    /// 账号泄露接口会根据 `truncateResponse` 返回两种形态，这里按内容推断：
    /// 先尝试只含 `Name` 的截断列表，再尝试完整记录。
    fn parse_breached_account(body: &[u8]) -> Result<ApiResponse> {
        if let Ok(truncated) = serde_json::from_slice::<Vec<TruncatedBreach>>(body) {
            let names = truncated.into_iter().map(|breach| breach.name).collect();
            return Ok(ApiResponse::BreachedAccountTruncated(names));
        }

        decode::<Vec<Breach>>(body).map(ApiResponse::BreachedAccount)
    }
}

/// `Retry-After` 秒数，缺失或非整数时取默认值
pub fn retry_after_secs(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| Error::MalformedResponse(e.to_string()))
}
