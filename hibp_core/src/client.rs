//! HIBP 客户端

use crate::error::{Error, Result};
use crate::protocol::KAnonymity;
use crate::request::{
    BreachedAccountOptions, RequestBuilder, RequestDescriptor, DEFAULT_API_BASE_URL,
    DEFAULT_PASSWORD_BASE_URL,
};
use crate::response::{RawResponse, ResponseRouter};
use crate::types::*;
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// API Key 环境变量
pub const HIBP_API_KEY_ENV: &str = "HIBP_API_KEY";

/// 默认 User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!("hibp-client/", env!("CARGO_PKG_VERSION"));

/// 调用方设置
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// haveibeenpwned.com API Key，仅账号相关查询需要
    pub api_key: Option<String>,
}

impl Settings {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }

    /// 从 `HIBP_API_KEY` 环境变量读取，空值视为未设置
    pub fn from_env() -> Self {
        let api_key = std::env::var(HIBP_API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());
        Self { api_key }
    }
}

/// 客户端配置
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub settings: Settings,
    /// User-Agent 请求头
    pub user_agent: String,
    /// API 根地址
    pub api_base_url: String,
    /// 密码范围查询根地址
    pub password_base_url: String,
    /// 请求超时（秒）
    pub timeout: u64,
    /// 是否验证 TLS 证书
    pub verify_tls: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            password_base_url: DEFAULT_PASSWORD_BASE_URL.to_string(),
            timeout: 30,
            verify_tls: true,
        }
    }
}

/// 传输层返回的 future
pub type TransportFuture = Pin<Box<dyn Future<Output = Result<RawResponse>> + Send>>;

/// HTTP 传输层，执行一次 GET 交换
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    fn execute(&self, request: RequestDescriptor) -> TransportFuture;
}

/// 基于 reqwest 的传输层
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self { http_client })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: RequestDescriptor) -> TransportFuture {
        let http_client = self.http_client.clone();
        Box::pin(async move {
            let response = http_client
                .get(request.url.clone())
                .headers(request.headers)
                .send()
                .await
                .map_err(|e| {
                    Error::Transport(format!(
                        "Failed to connect to {}: {}",
                        request.url.host_str().unwrap_or_default(),
                        e
                    ))
                })?;

            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|e| Error::Transport(format!("Failed to read response body: {}", e)))?;

            Ok(RawResponse {
                status,
                headers,
                body: body.to_vec(),
            })
        })
    }
}

/// HIBP 客户端
///
/// 每个操作是一次独立的请求/响应交换，客户端本身不保存任何查询结果。
#[derive(Clone)]
pub struct HibpClient {
    requests: RequestBuilder,
    transport: Arc<dyn Transport>,
}

impl HibpClient {
    /// 创建新的客户端实例
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// 使用自定义传输层创建客户端
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let requests = RequestBuilder::new(
            &config.api_base_url,
            &config.password_base_url,
            &config.user_agent,
            config.settings.api_key,
        )?;

        Ok(Self {
            requests,
            transport,
        })
    }

    /// 使用 API Key 和默认配置创建客户端
    pub fn with_api_key(api_key: &str) -> Result<Self> {
        let mut config = ClientConfig::default();
        config.settings.api_key = Some(api_key.to_string());
        Self::new(config)
    }

    /// 请求构造器
    pub fn requests(&self) -> &RequestBuilder {
        &self.requests
    }

    /// 发送请求并按其端点解析响应
    pub async fn send(&self, request: RequestDescriptor) -> Result<ApiResponse> {
        let endpoint = request.endpoint;
        debug!(
            "Sending {:?} request to {}",
            endpoint,
            request.url.host_str().unwrap_or_default()
        );

        let response = self.transport.execute(request).await?;
        let result = ResponseRouter::route_raw(endpoint, &response);

        match &result {
            Ok(_) => debug!("{:?} request succeeded", endpoint),
            Err(Error::TooManyRequests { retry_after }) => {
                warn!("{:?} request rate limited, retry after {}s", endpoint, retry_after)
            }
            Err(e) => debug!("{:?} request failed: {}", endpoint, e),
        }

        result
    }

    /// 在后台任务中发送请求，返回的句柄可用于 `abort()` 取消
    pub fn spawn(&self, request: RequestDescriptor) -> JoinHandle<Result<ApiResponse>> {
        let client = self.clone();
        tokio::spawn(async move { client.send(request).await })
    }

    /// 查询账号涉及的泄露事件
    ///
    /// 返回形态由服务端响应推断：截断时只有名称，否则为完整记录。
    pub async fn breached_account(
        &self,
        account: &str,
        options: &BreachedAccountOptions,
    ) -> Result<BreachedAccount> {
        let request = self.requests.breached_account(account, options)?;
        match self.send(request).await? {
            ApiResponse::BreachedAccount(breaches) => Ok(BreachedAccount::Full(breaches)),
            ApiResponse::BreachedAccountTruncated(names) => Ok(BreachedAccount::Truncated(names)),
            other => Err(unexpected(other)),
        }
    }

    /// 获取全部泄露事件，可按域名过滤
    pub async fn breaches(&self, domain: Option<&str>) -> Result<Vec<Breach>> {
        let request = self.requests.breaches(domain)?;
        match self.send(request).await? {
            ApiResponse::Breaches(breaches) => Ok(breaches),
            other => Err(unexpected(other)),
        }
    }

    /// 按名称获取单个泄露事件
    pub async fn breach(&self, name: &str) -> Result<Breach> {
        let request = self.requests.breach(name)?;
        match self.send(request).await? {
            ApiResponse::Breach(breach) => Ok(breach),
            other => Err(unexpected(other)),
        }
    }

    /// 获取全部数据类别
    pub async fn data_classes(&self) -> Result<Vec<String>> {
        let request = self.requests.data_classes()?;
        match self.send(request).await? {
            ApiResponse::DataClasses(classes) => Ok(classes),
            other => Err(unexpected(other)),
        }
    }

    /// 查询邮箱出现过的 paste
    pub async fn pastes(&self, email: &str) -> Result<Vec<Paste>> {
        let request = self.requests.pastes(email)?;
        match self.send(request).await? {
            ApiResponse::Pastes(pastes) => Ok(pastes),
            other => Err(unexpected(other)),
        }
    }

    /// 获取某个 5 位前缀下的全部后缀
    pub async fn password_range(&self, prefix: &str) -> Result<Vec<RangeEntry>> {
        let request = self.requests.password_range(prefix)?;
        match self.send(request).await? {
            ApiResponse::PasswordRange(entries) => Ok(entries),
            other => Err(unexpected(other)),
        }
    }

    /// 按 SHA-1 摘要查询泄露次数，只有前缀会被发送
    pub async fn search_range(&self, digest: &str) -> Result<u64> {
        let (prefix, _) = KAnonymity::encode(digest)?;
        let entries = self.password_range(&prefix).await?;
        let count = KAnonymity::resolve(&digest.to_ascii_uppercase(), &entries);

        info!(
            "Range {} returned {} candidates, match: {}",
            prefix,
            entries.len(),
            count > 0
        );
        Ok(count)
    }

    /// 查询明文密码的泄露次数
    pub async fn search_password(&self, password: &str) -> Result<u64> {
        self.search_range(&KAnonymity::sha1_hex_str(password)).await
    }

    /// 查询字节形式密码的泄露次数
    pub async fn search_password_bytes(&self, password: &[u8]) -> Result<u64> {
        self.search_range(&KAnonymity::sha1_hex(password)).await
    }
}

fn unexpected(response: ApiResponse) -> Error {
    Error::MalformedResponse(format!("unexpected response variant: {:?}", response))
}
