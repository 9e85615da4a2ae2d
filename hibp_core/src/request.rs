//! 请求构造
//!
//! 为六个远程操作生成请求描述（URL + 请求头），不做任何 I/O。

use crate::error::{Error, Result};
use crate::protocol::KAnonymity;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Url;

/// API 版本
pub const API_VERSION: u32 = 3;

/// `Accept` 内容协商，携带 API 版本
pub fn content_negotiation() -> String {
    format!("application/vnd.haveibeenpwned.v{}+json", API_VERSION)
}

/// API Key 请求头
pub const API_KEY_HEADER: &str = "hibp-api-key";

/// 默认 API 根地址
pub const DEFAULT_API_BASE_URL: &str = "https://haveibeenpwned.com/api/v3";

/// 默认密码范围查询地址（与 API 不同主机）
pub const DEFAULT_PASSWORD_BASE_URL: &str = "https://api.pwnedpasswords.com";

/// 远程端点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `GET /breachedaccount/{account}`
    BreachedAccount,
    /// `GET /breaches`
    Breaches,
    /// `GET /breach/{name}`
    Breach,
    /// `GET /dataclasses`
    DataClasses,
    /// `GET /pasteaccount/{email}`
    PasteAccount,
    /// `GET /range/{prefix}`，密码范围主机
    PasswordRange,
}

impl Endpoint {
    /// 路径片段
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::BreachedAccount => "breachedaccount",
            Endpoint::Breaches => "breaches",
            Endpoint::Breach => "breach",
            Endpoint::DataClasses => "dataclasses",
            Endpoint::PasteAccount => "pasteaccount",
            Endpoint::PasswordRange => "range",
        }
    }

    /// 是否需要 API Key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Endpoint::BreachedAccount | Endpoint::PasteAccount)
    }

    /// 是否需要路径参数
    pub fn requires_path_parameter(&self) -> bool {
        !matches!(self, Endpoint::Breaches | Endpoint::DataClasses)
    }

    fn uses_password_host(&self) -> bool {
        matches!(self, Endpoint::PasswordRange)
    }
}

/// 账号泄露查询的可选参数，未设置的参数不会出现在查询串中
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreachedAccountOptions {
    /// 只返回该域名下的泄露
    pub domain: Option<String>,
    /// 是否包含未验证的泄露
    pub include_unverified: Option<bool>,
    /// 是否只返回名称
    pub truncate_response: Option<bool>,
}

impl BreachedAccountOptions {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(domain) = self.domain.as_deref().filter(|domain| !domain.is_empty()) {
            query.push(("domain", domain.to_string()));
        }
        if let Some(include_unverified) = self.include_unverified {
            query.push(("includeUnverified", include_unverified.to_string()));
        }
        if let Some(truncate_response) = self.truncate_response {
            query.push(("truncateResponse", truncate_response.to_string()));
        }
        query
    }
}

/// 请求描述，携带发起它的端点，供响应解析时使用
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub endpoint: Endpoint,
    pub url: Url,
    pub headers: HeaderMap,
}

impl RequestDescriptor {
    pub fn requires_api_key(&self) -> bool {
        self.endpoint.requires_api_key()
    }
}

/// 请求构造器
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    api_base_url: Url,
    password_base_url: Url,
    user_agent: String,
    api_key: Option<String>,
}

impl RequestBuilder {
    /// 创建构造器，根地址无法解析时返回 `InvalidInput`
    pub fn new(
        api_base_url: &str,
        password_base_url: &str,
        user_agent: &str,
        api_key: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            api_base_url: parse_base_url(api_base_url)?,
            password_base_url: parse_base_url(password_base_url)?,
            user_agent: user_agent.to_string(),
            api_key,
        })
    }

    /// 构造请求
    ///
    /// 路径参数按单个路径段做百分号编码。需要 API Key 的端点在未配置 Key 时
    /// 返回 `MissingApiKey`。
    pub fn build(
        &self,
        endpoint: Endpoint,
        path_parameter: Option<&str>,
        query: &[(&str, String)],
    ) -> Result<RequestDescriptor> {
        let mut url = if endpoint.uses_password_host() {
            self.password_base_url.clone()
        } else {
            self.api_base_url.clone()
        };

        let parameter = match (endpoint.requires_path_parameter(), path_parameter) {
            // 空串、`.` 和 `..` 无法作为单个路径段保留
            (true, Some(parameter)) if matches!(parameter, "" | "." | "..") => {
                return Err(Error::InvalidInput(format!(
                    "path parameter {:?} cannot be encoded as a path segment",
                    parameter
                )))
            }
            (true, Some(parameter)) => Some(parameter),
            (true, None) => {
                return Err(Error::InvalidInput(format!(
                    "endpoint {:?} requires a path parameter",
                    endpoint
                )))
            }
            (false, Some(_)) => {
                return Err(Error::InvalidInput(format!(
                    "endpoint {:?} does not take a path parameter",
                    endpoint
                )))
            }
            (false, None) => None,
        };

        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                Error::InvalidInput("base URL cannot carry path segments".to_string())
            })?;
            segments.pop_if_empty().push(endpoint.path());
            if let Some(parameter) = parameter {
                segments.push(parameter);
            }
        }

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, header_value(&content_negotiation(), "Accept")?);
        headers.insert(USER_AGENT, header_value(&self.user_agent, "User-Agent")?);

        if endpoint.requires_api_key() {
            let api_key = self
                .api_key
                .as_deref()
                .ok_or(Error::MissingApiKey { endpoint })?;
            let mut value = header_value(api_key, API_KEY_HEADER)?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
        }

        Ok(RequestDescriptor {
            endpoint,
            url,
            headers,
        })
    }

    /// `GET /breachedaccount/{account}`
    pub fn breached_account(
        &self,
        account: &str,
        options: &BreachedAccountOptions,
    ) -> Result<RequestDescriptor> {
        self.build(Endpoint::BreachedAccount, Some(account), &options.query())
    }

    /// `GET /breaches`
    pub fn breaches(&self, domain: Option<&str>) -> Result<RequestDescriptor> {
        let query: Vec<(&str, String)> = domain
            .filter(|domain| !domain.is_empty())
            .map(|domain| vec![("domain", domain.to_string())])
            .unwrap_or_default();
        self.build(Endpoint::Breaches, None, &query)
    }

    /// `GET /breach/{name}`
    pub fn breach(&self, name: &str) -> Result<RequestDescriptor> {
        self.build(Endpoint::Breach, Some(name), &[])
    }

    /// `GET /dataclasses`
    pub fn data_classes(&self) -> Result<RequestDescriptor> {
        self.build(Endpoint::DataClasses, None, &[])
    }

    /// `GET /pasteaccount/{email}`
    pub fn pastes(&self, email: &str) -> Result<RequestDescriptor> {
        self.build(Endpoint::PasteAccount, Some(email), &[])
    }

    /// `GET /range/{prefix}`，前缀必须是 5 位十六进制
    pub fn password_range(&self, prefix: &str) -> Result<RequestDescriptor> {
        let prefix = KAnonymity::normalize_prefix(prefix)?;
        self.build(Endpoint::PasswordRange, Some(prefix.as_str()), &[])
    }
}

fn parse_base_url(base: &str) -> Result<Url> {
    Url::parse(base).map_err(|e| Error::InvalidInput(format!("invalid base URL {}: {}", base, e)))
}

fn header_value(value: &str, name: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::InvalidInput(format!("{} contains invalid header characters", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(api_key: Option<&str>) -> RequestBuilder {
        RequestBuilder::new(
            DEFAULT_API_BASE_URL,
            DEFAULT_PASSWORD_BASE_URL,
            "hibp-test",
            api_key.map(str::to_string),
        )
        .unwrap()
    }

    #[test]
    fn test_breached_account_request() {
        let options = BreachedAccountOptions {
            domain: Some("adobe.com".to_string()),
            include_unverified: Some(true),
            truncate_response: Some(false),
        };
        let request = builder(Some("secret"))
            .breached_account("test@example.com", &options)
            .unwrap();

        assert_eq!(request.endpoint, Endpoint::BreachedAccount);
        assert_eq!(
            request.url.as_str(),
            "https://haveibeenpwned.com/api/v3/breachedaccount/test@example.com\
             ?domain=adobe.com&includeUnverified=true&truncateResponse=false"
        );
        assert_eq!(request.headers[ACCEPT], content_negotiation().as_str());
        assert_eq!(request.headers[USER_AGENT], "hibp-test");
        assert_eq!(request.headers[API_KEY_HEADER], "secret");
        assert!(request.headers[API_KEY_HEADER].is_sensitive());
        assert!(request.requires_api_key());
    }

    #[test]
    fn test_missing_api_key() {
        let builder = builder(None);
        let err = builder
            .breached_account("test@example.com", &BreachedAccountOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingApiKey { endpoint: Endpoint::BreachedAccount }
        ));

        let err = builder.pastes("test@example.com").unwrap_err();
        assert!(matches!(
            err,
            Error::MissingApiKey { endpoint: Endpoint::PasteAccount }
        ));
    }

    #[test]
    fn test_public_endpoints_skip_api_key() {
        let builder = builder(Some("secret"));
        for request in [
            builder.breaches(None).unwrap(),
            builder.breach("Adobe").unwrap(),
            builder.data_classes().unwrap(),
            builder.password_range("5BAA6").unwrap(),
        ] {
            assert!(!request.requires_api_key());
            assert!(request.headers.get(API_KEY_HEADER).is_none());
            assert_eq!(request.headers[ACCEPT], content_negotiation().as_str());
        }
    }

    #[test]
    fn test_path_parameter_is_percent_encoded() {
        let request = builder(None).breach("Bad Name/../x?y#z").unwrap();
        assert_eq!(
            request.url.as_str(),
            "https://haveibeenpwned.com/api/v3/breach/Bad%20Name%2F..%2Fx%3Fy%23z"
        );
        assert_eq!(request.url.path_segments().unwrap().count(), 4);
    }

    #[test]
    fn test_breaches_request() {
        let builder = builder(None);
        assert_eq!(
            builder.breaches(None).unwrap().url.as_str(),
            "https://haveibeenpwned.com/api/v3/breaches"
        );
        assert_eq!(
            builder.breaches(Some("adobe.com")).unwrap().url.as_str(),
            "https://haveibeenpwned.com/api/v3/breaches?domain=adobe.com"
        );
        assert_eq!(
            builder.breaches(Some("")).unwrap().url.as_str(),
            "https://haveibeenpwned.com/api/v3/breaches"
        );
        assert_eq!(
            builder.data_classes().unwrap().url.as_str(),
            "https://haveibeenpwned.com/api/v3/dataclasses"
        );
    }

    #[test]
    fn test_password_range_request() {
        let request = builder(None).password_range("5baa6").unwrap();
        assert_eq!(request.endpoint, Endpoint::PasswordRange);
        assert_eq!(request.url.as_str(), "https://api.pwnedpasswords.com/range/5BAA6");

        assert!(matches!(
            builder(None).password_range("5BAA61"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_path_parameter_presence() {
        let builder = builder(Some("secret"));
        assert!(matches!(
            builder.build(Endpoint::Breach, None, &[]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            builder.build(Endpoint::DataClasses, Some("x"), &[]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_dot_segments_rejected() {
        let builder = builder(Some("secret"));
        for parameter in ["", ".", ".."] {
            assert!(matches!(
                builder.breached_account(parameter, &BreachedAccountOptions::default()),
                Err(Error::InvalidInput(_))
            ));
            assert!(matches!(builder.breach(parameter), Err(Error::InvalidInput(_))));
            assert!(matches!(builder.pastes(parameter), Err(Error::InvalidInput(_))));
        }

        // 仅整段为点号时才拒绝
        let request = builder.breach("...").unwrap();
        assert_eq!(request.url.as_str(), "https://haveibeenpwned.com/api/v3/breach/...");
        let request = builder.breach("a.b").unwrap();
        assert_eq!(request.url.as_str(), "https://haveibeenpwned.com/api/v3/breach/a.b");
    }

    #[test]
    fn test_content_negotiation_carries_version() {
        assert_eq!(content_negotiation(), "application/vnd.haveibeenpwned.v3+json");
        let request = builder(None).data_classes().unwrap();
        assert_eq!(
            request.headers[ACCEPT],
            format!("application/vnd.haveibeenpwned.v{}+json", API_VERSION).as_str()
        );
    }

    #[test]
    fn test_invalid_base_and_header() {
        assert!(RequestBuilder::new("not a url", DEFAULT_PASSWORD_BASE_URL, "ua", None).is_err());

        let builder = RequestBuilder::new(
            "mailto:someone@example.com",
            DEFAULT_PASSWORD_BASE_URL,
            "ua",
            None,
        )
        .unwrap();
        assert!(matches!(builder.data_classes(), Err(Error::InvalidInput(_))));

        let builder = RequestBuilder::new(
            DEFAULT_API_BASE_URL,
            DEFAULT_PASSWORD_BASE_URL,
            "bad\nagent",
            None,
        )
        .unwrap();
        assert!(matches!(builder.data_classes(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_trailing_slash_base_url() {
        let builder = RequestBuilder::new(
            "http://127.0.0.1:8080/api/v3/",
            "http://127.0.0.1:8080/",
            "ua",
            None,
        )
        .unwrap();
        assert_eq!(
            builder.data_classes().unwrap().url.as_str(),
            "http://127.0.0.1:8080/api/v3/dataclasses"
        );
        assert_eq!(
            builder.password_range("00000").unwrap().url.as_str(),
            "http://127.0.0.1:8080/range/00000"
        );
    }
}
