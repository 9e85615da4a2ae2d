//! 数据类型定义

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 泄露事件
///
/// 只由服务端 JSON 解码得到，之后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Breach {
    /// 唯一且稳定的名称（不直接展示给用户）
    pub name: String,
    /// 展示用标题
    pub title: String,
    /// 主站域名
    pub domain: String,
    /// 泄露发生日期（无时间）
    pub breach_date: NaiveDate,
    /// 录入时间
    pub added_date: DateTime<Utc>,
    /// 最后修改时间
    pub modified_date: DateTime<Utc>,
    /// 收录的账号数
    pub pwn_count: u64,
    /// HTML 描述
    pub description: String,
    /// 泄露的数据类别
    pub data_classes: Vec<String>,
    pub is_verified: bool,
    pub is_fabricated: bool,
    pub is_sensitive: bool,
    pub is_retired: bool,
    pub is_spam_list: bool,
    /// Logo 地址（PNG）
    #[serde(default)]
    pub logo_path: Option<String>,
}

impl fmt::Display for Breach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.title, self.domain)
    }
}

/// 截断模式下的泄露记录，只有 `Name`
///
/// 拒绝未知字段，完整的 `Breach` 对象不会被误认为截断记录。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TruncatedBreach {
    #[serde(rename = "Name")]
    pub name: String,
}

/// 账号泄露查询结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BreachedAccount {
    /// 完整记录
    Full(Vec<Breach>),
    /// 仅名称
    Truncated(Vec<String>),
}

impl BreachedAccount {
    /// 泄露事件名称列表，两种形态通用
    pub fn names(&self) -> Vec<&str> {
        match self {
            BreachedAccount::Full(breaches) => breaches.iter().map(|b| b.name.as_str()).collect(),
            BreachedAccount::Truncated(names) => names.iter().map(String::as_str).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BreachedAccount::Full(breaches) => breaches.len(),
            BreachedAccount::Truncated(names) => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Paste 站点上的暴露记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Paste {
    /// 来源服务（Pastebin、Pastie 等）
    pub source: String,
    /// 来源站点上的 ID
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// 发布时间（精确到秒），可能缺失
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    pub email_count: u64,
}

impl fmt::Display for Paste {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.title {
            Some(title) => write!(f, "{} | {}", title, self.source),
            None => write!(f, "{} | {}", self.id, self.source),
        }
    }
}

/// 同前缀下的一条后缀及其出现次数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeEntry {
    /// SHA-1 后 35 位
    pub suffix: String,
    pub count: u64,
}

impl RangeEntry {
    pub fn new(suffix: String, count: u64) -> Self {
        Self { suffix, count }
    }
}

impl fmt::Display for RangeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.suffix, self.count)
    }
}

/// 按端点解析后的响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResponse {
    BreachedAccount(Vec<Breach>),
    BreachedAccountTruncated(Vec<String>),
    Breaches(Vec<Breach>),
    Breach(Breach),
    DataClasses(Vec<String>),
    Pastes(Vec<Paste>),
    PasswordRange(Vec<RangeEntry>),
}
