//! Have I Been Pwned 客户端核心库
//!
//! 提供：
//! - 泄露事件查询（按账号、域名、名称）
//! - Paste 暴露查询
//! - 基于 k-匿名的密码泄露查询（只发送 SHA-1 前 5 位）

pub mod client;
pub mod error;
pub mod protocol;
pub mod request;
pub mod response;
pub mod types;

pub use client::{ClientConfig, HibpClient, ReqwestTransport, Settings, Transport, TransportFuture};
pub use error::{Error, Result};
pub use protocol::KAnonymity;
pub use request::{BreachedAccountOptions, Endpoint, RequestBuilder, RequestDescriptor};
pub use response::{RawResponse, ResponseRouter};
pub use types::*;
