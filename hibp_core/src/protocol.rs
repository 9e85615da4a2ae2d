//! 密码 k-匿名查询协议
//!
//! 协议流程：
//! 1. 计算密码的 SHA-1 摘要（40 位大写十六进制）
//! 2. 只把前 5 位（prefix）发送给服务端 `/range/{prefix}`
//! 3. 服务端返回所有同前缀摘要的后 35 位及出现次数，格式为 `SUFFIX:COUNT\r\n`
//! 4. 客户端在本地用完整后缀精确匹配，完整摘要不会离开本机
//!
//! 本模块全部为纯函数，无 I/O、无共享状态。

use crate::error::{Error, Result};
use crate::types::RangeEntry;
use sha1::{Digest, Sha1};

/// SHA-1 十六进制摘要长度
pub const DIGEST_LEN: usize = 40;

/// 发送给服务端的前缀长度
pub const PREFIX_LEN: usize = 5;

/// 本地匹配用的后缀长度
pub const SUFFIX_LEN: usize = DIGEST_LEN - PREFIX_LEN;

/// k-匿名密码查询协议
pub struct KAnonymity;

impl KAnonymity {
    /// 计算 SHA-1，返回大写十六进制
    pub fn sha1_hex(data: &[u8]) -> String {
        let mut hasher = Sha1::new();
        hasher.update(data);
        hex::encode_upper(hasher.finalize())
    }

    /// 计算 UTF-8 字符串的 SHA-1
    pub fn sha1_hex_str(text: &str) -> String {
        Self::sha1_hex(text.as_bytes())
    }

    /// 把完整摘要拆分为 (prefix, suffix)
    ///
    /// 输入大小写不敏感，拆分前统一转为大写。长度不是 40 或含非十六进制字符时
    /// 返回 `InvalidInput`，避免向服务端发送畸形查询。
    pub fn encode(digest: &str) -> Result<(String, String)> {
        if digest.len() != DIGEST_LEN {
            return Err(Error::InvalidInput(format!(
                "SHA-1 digest must be {} hex characters, got {}",
                DIGEST_LEN,
                digest.len()
            )));
        }
        if !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidInput(
                "SHA-1 digest contains non-hexadecimal characters".to_string(),
            ));
        }

        let digest = digest.to_ascii_uppercase();
        let (prefix, suffix) = digest.split_at(PREFIX_LEN);
        Ok((prefix.to_string(), suffix.to_string()))
    }

    /// 校验单独的 5 位前缀，返回大写形式
    pub fn normalize_prefix(prefix: &str) -> Result<String> {
        if prefix.len() != PREFIX_LEN || !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidInput(format!(
                "range prefix must be {} hex characters",
                PREFIX_LEN
            )));
        }
        Ok(prefix.to_ascii_uppercase())
    }

    /// 解析 `/range` 响应体
    ///
    /// 行以 CRLF 分隔（也接受单独的 LF）。每个非空行必须是 `SUFFIX:COUNT`，
    /// 不符合的行直接跳过。后缀统一存为大写，顺序与原始行一致。
    pub fn parse_range(body: &[u8]) -> Result<Vec<RangeEntry>> {
        let text = std::str::from_utf8(body)
            .map_err(|e| Error::MalformedResponse(format!("range body is not UTF-8: {}", e)))?;

        let entries = text
            .lines()
            .filter_map(|line| {
                let mut tokens = line.split(':');
                let suffix = tokens.next()?;
                let count = tokens.next()?;
                if tokens.next().is_some() || suffix.is_empty() {
                    return None;
                }
                let count = count.parse::<u64>().ok()?;
                Some(RangeEntry::new(suffix.to_ascii_uppercase(), count))
            })
            .collect();

        Ok(entries)
    }

    /// 在同前缀的候选集中查找摘要，返回出现次数，未命中返回 0
    ///
    /// 重复后缀时取第一个。摘要太短（不足以取出后缀）时返回 0。
    pub fn resolve(digest: &str, entries: &[RangeEntry]) -> u64 {
        let suffix = match digest.get(PREFIX_LEN..) {
            Some(suffix) if !suffix.is_empty() => suffix,
            _ => return 0,
        };

        entries
            .iter()
            .find(|entry| entry.suffix.eq_ignore_ascii_case(suffix))
            .map(|entry| entry.count)
            .unwrap_or(0)
    }

    /// 明文密码在候选集中的出现次数
    pub fn search_password(password: &str, entries: &[RangeEntry]) -> u64 {
        Self::resolve(&Self::sha1_hex_str(password), entries)
    }

    /// 原始字节形式的密码在候选集中的出现次数
    pub fn search_password_bytes(password: &[u8], entries: &[RangeEntry]) -> u64 {
        Self::resolve(&Self::sha1_hex(password), entries)
    }
}
