//! 集成测试

use hibp_core::{
    ApiResponse, BreachedAccount, BreachedAccountOptions, ClientConfig, Endpoint, Error,
    HibpClient, KAnonymity, RawResponse, RequestBuilder, RequestDescriptor, ResponseRouter,
    Settings, Transport, TransportFuture,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// 按 URL 路径依次返回预设响应，最后一个响应重复使用，并记录收到的请求
#[derive(Default)]
struct FixtureTransport {
    responses: Mutex<HashMap<String, VecDeque<(u16, String)>>>,
    seen: Mutex<Vec<RequestDescriptor>>,
}

impl FixtureTransport {
    fn with(self, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back((status, body.to_string()));
        self
    }
}

impl Transport for FixtureTransport {
    fn execute(&self, request: RequestDescriptor) -> TransportFuture {
        let response = self
            .responses
            .lock()
            .unwrap()
            .get_mut(request.url.path())
            .and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            });
        self.seen.lock().unwrap().push(request);
        Box::pin(async move {
            match response {
                Some((status, body)) => Ok(RawResponse::new(status, body)),
                None => Err(Error::Transport("no fixture".to_string())),
            }
        })
    }
}

const BREACH_JSON: &str = r#"{
    "Name": "LinkedIn",
    "Title": "LinkedIn",
    "Domain": "linkedin.com",
    "BreachDate": "2012-05-05",
    "AddedDate": "2016-05-21T21:35:40Z",
    "ModifiedDate": "2016-05-21T21:35:40Z",
    "PwnCount": 164611595,
    "Description": "In May 2016, LinkedIn had 164 million email addresses and passwords exposed.",
    "LogoPath": "https://haveibeenpwned.com/Content/Images/PwnedLogos/LinkedIn.png",
    "DataClasses": ["Email addresses", "Passwords"],
    "IsVerified": true,
    "IsFabricated": false,
    "IsSensitive": false,
    "IsRetired": false,
    "IsSpamList": false
}"#;

fn client(transport: Arc<FixtureTransport>, api_key: Option<&str>) -> HibpClient {
    let config = ClientConfig {
        settings: Settings::new(api_key.map(str::to_string)),
        ..ClientConfig::default()
    };
    HibpClient::with_transport(config, transport).expect("Failed to create client")
}

#[test]
fn test_password_search_without_client() {
    // 调用方自行执行 HTTP 的流程：构造 → 传输 → 路由 → 匹配
    let builder = RequestBuilder::new(
        "https://haveibeenpwned.com/api/v3",
        "https://api.pwnedpasswords.com",
        "integration-test",
        None,
    )
    .unwrap();

    let digest = KAnonymity::sha1_hex_str("password");
    let (prefix, suffix) = KAnonymity::encode(&digest).unwrap();
    let request = builder.password_range(&prefix).unwrap();
    assert!(request.url.as_str().ends_with("/range/5BAA6"));
    assert!(!request.url.as_str().contains(&suffix));

    let body = format!("{}:10434004\r\n0018A45C4D1DEF81644B54AB7F969B88D65:1\r\n", suffix);
    let response =
        ResponseRouter::route_raw(request.endpoint, &RawResponse::new(200, body)).unwrap();
    match response {
        ApiResponse::PasswordRange(entries) => {
            assert_eq!(KAnonymity::resolve(&digest, &entries), 10_434_004);
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn test_breached_account_both_shapes() {
    let transport = Arc::new(
        FixtureTransport::default()
            .with(
                "/api/v3/breachedaccount/truncated@example.com",
                200,
                r#"[{"Name":"Adobe"},{"Name":"LinkedIn"}]"#,
            )
            .with(
                "/api/v3/breachedaccount/full@example.com",
                200,
                &format!("[{}]", BREACH_JSON),
            ),
    );
    let client = client(transport.clone(), Some("secret"));

    let truncated = client
        .breached_account("truncated@example.com", &BreachedAccountOptions::default())
        .await
        .unwrap();
    assert_eq!(
        truncated,
        BreachedAccount::Truncated(vec!["Adobe".to_string(), "LinkedIn".to_string()])
    );

    let options = BreachedAccountOptions {
        truncate_response: Some(false),
        ..BreachedAccountOptions::default()
    };
    let full = client.breached_account("full@example.com", &options).await.unwrap();
    match full {
        BreachedAccount::Full(breaches) => {
            assert_eq!(breaches.len(), 1);
            assert_eq!(breaches[0].pwn_count, 164_611_595);
        }
        other => panic!("unexpected result: {:?}", other),
    }

    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|request| request.endpoint == Endpoint::BreachedAccount));
    assert_eq!(seen[1].url.query(), Some("truncateResponse=false"));
}

#[tokio::test]
async fn test_public_lookups() {
    let transport = Arc::new(
        FixtureTransport::default()
            .with("/api/v3/breaches", 200, &format!("[{}]", BREACH_JSON))
            .with("/api/v3/breach/LinkedIn", 200, BREACH_JSON)
            .with("/api/v3/dataclasses", 200, r#"["Email addresses","Passwords"]"#)
            .with("/api/v3/breach/Unknown", 404, ""),
    );
    let client = client(transport.clone(), None);

    let breaches = client.breaches(Some("linkedin.com")).await.unwrap();
    assert_eq!(breaches[0].domain, "linkedin.com");

    let breach = client.breach("LinkedIn").await.unwrap();
    assert_eq!(breach.title, "LinkedIn");

    let classes = client.data_classes().await.unwrap();
    assert_eq!(classes.len(), 2);

    assert!(matches!(client.breach("Unknown").await, Err(Error::NotFound)));

    // 公共端点不携带 API Key
    let seen = transport.seen.lock().unwrap();
    assert!(seen.iter().all(|request| request.headers.get("hibp-api-key").is_none()));
}

#[tokio::test]
async fn test_pastes_rate_limited_then_ok() {
    let transport = Arc::new(
        FixtureTransport::default()
            .with("/api/v3/pasteaccount/test@example.com", 429, "")
            .with(
                "/api/v3/pasteaccount/test@example.com",
                200,
                r#"[{"Source":"Pastebin","Id":"8Q0BvKD8","Title":null,"Date":null,"EmailCount":139}]"#,
            ),
    );
    let client = client(transport.clone(), Some("secret"));

    let err = client.pastes("test@example.com").await.unwrap_err();
    assert!(matches!(err, Error::TooManyRequests { retry_after: 2 }));

    // 同一个客户端在失败后继续可用
    let pastes = client.pastes("test@example.com").await.unwrap();
    assert_eq!(pastes[0].email_count, 139);

    let seen = transport.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|request| request.endpoint == Endpoint::PasteAccount));
}

#[tokio::test]
#[ignore = "requires network access"]
async fn test_search_password_live() {
    let client = HibpClient::new(ClientConfig::default()).expect("Failed to create client");
    let count = client.search_password("password").await.unwrap();
    assert!(count > 0, "\"password\" should be found in the breach database");
}
