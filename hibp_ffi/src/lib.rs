//! Pwned Passwords k-匿名 FFI 绑定
//!
//! 提供 C ABI 兼容的接口，供其他语言在自行发起 HTTP 请求时复用哈希、拆分和匹配逻辑

use std::ffi::{c_char, c_int, c_uchar, c_ulong, CStr, CString};
use std::ptr;
use std::slice;

use hibp_core::{Error, KAnonymity};

/// 错误码定义
pub const HIBP_OK: c_int = 0;
pub const HIBP_ERR_NULL_PTR: c_int = -1;
pub const HIBP_ERR_INVALID_PARAM: c_int = -2;
pub const HIBP_ERR_MALFORMED: c_int = -3;
pub const HIBP_ERR_ENCODING: c_int = -4;

/// 摘要输出缓冲区最小长度（含结尾 NUL）
pub const HIBP_DIGEST_BUF_LEN: c_ulong = 41;
/// 前缀输出缓冲区最小长度（含结尾 NUL）
pub const HIBP_PREFIX_BUF_LEN: c_ulong = 6;
/// 后缀输出缓冲区最小长度（含结尾 NUL）
pub const HIBP_SUFFIX_BUF_LEN: c_ulong = 36;

fn error_code(err: &Error) -> c_int {
    match err {
        Error::MalformedResponse(_) => HIBP_ERR_MALFORMED,
        _ => HIBP_ERR_INVALID_PARAM,
    }
}

/// 把字符串连同结尾 NUL 写入调用方缓冲区
///
/// # Safety
/// `out` 至少要能容纳 `value.len() + 1` 字节
unsafe fn write_c_string(value: String, out: *mut c_char) -> Result<usize, c_int> {
    let c_str = CString::new(value).map_err(|_| HIBP_ERR_ENCODING)?;
    let bytes = c_str.as_bytes_with_nul();
    ptr::copy_nonoverlapping(bytes.as_ptr(), out as *mut u8, bytes.len());
    Ok(bytes.len() - 1)
}

fn read_c_str<'a>(value: *const c_char) -> Result<&'a str, c_int> {
    let c_str = unsafe { CStr::from_ptr(value) };
    c_str.to_str().map_err(|_| HIBP_ERR_ENCODING)
}

/// 计算 SHA-1，输出 40 位大写十六进制字符串
///
/// `out_str` 至少 `HIBP_DIGEST_BUF_LEN` 字节，`out_len` 返回不含 NUL 的长度
#[no_mangle]
pub extern "C" fn hibp_sha1_hex(
    data: *const c_uchar,
    data_len: c_ulong,
    out_str: *mut c_char,
    out_len: *mut c_ulong,
) -> c_int {
    if data.is_null() || out_str.is_null() || out_len.is_null() {
        return HIBP_ERR_NULL_PTR;
    }

    let data_slice = unsafe { slice::from_raw_parts(data, data_len as usize) };
    let digest = KAnonymity::sha1_hex(data_slice);

    match unsafe { write_c_string(digest, out_str) } {
        Ok(len) => {
            unsafe {
                *out_len = len as c_ulong;
            }
            HIBP_OK
        }
        Err(code) => code,
    }
}

/// 拆分摘要为 5 位前缀和 35 位后缀（均为大写）
///
/// 只有前缀需要发送到服务端
#[no_mangle]
pub extern "C" fn hibp_k_anonymity(
    digest: *const c_char,
    out_prefix: *mut c_char,
    out_suffix: *mut c_char,
) -> c_int {
    if digest.is_null() || out_prefix.is_null() || out_suffix.is_null() {
        return HIBP_ERR_NULL_PTR;
    }

    let digest = match read_c_str(digest) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let (prefix, suffix) = match KAnonymity::encode(digest) {
        Ok(parts) => parts,
        Err(e) => return error_code(&e),
    };

    unsafe {
        if let Err(code) = write_c_string(prefix, out_prefix) {
            return code;
        }
        if let Err(code) = write_c_string(suffix, out_suffix) {
            return code;
        }
    }

    HIBP_OK
}

/// 解析 range 响应体并返回摘要对应的泄露次数
///
/// 未命中时 `out_count` 为 0
#[no_mangle]
pub extern "C" fn hibp_range_count(
    digest: *const c_char,
    body: *const c_uchar,
    body_len: c_ulong,
    out_count: *mut u64,
) -> c_int {
    if digest.is_null() || body.is_null() || out_count.is_null() {
        return HIBP_ERR_NULL_PTR;
    }

    let digest = match read_c_str(digest) {
        Ok(s) => s,
        Err(code) => return code,
    };
    if let Err(e) = KAnonymity::encode(digest) {
        return error_code(&e);
    }

    let body_slice = unsafe { slice::from_raw_parts(body, body_len as usize) };
    match KAnonymity::parse_range(body_slice) {
        Ok(entries) => {
            unsafe {
                *out_count = KAnonymity::resolve(digest, &entries);
            }
            HIBP_OK
        }
        Err(e) => error_code(&e),
    }
}
