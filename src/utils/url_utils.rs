// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use url::{ParseError, Url};

/// 派生哈希ID时使用的十六进制字符数
const HASH_ID_LEN: usize = 16;

/// 与商品本身无关的跟踪参数
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "nacn", "napm", "nl-au", "nl-query", "nl-ts-pid", "ref", "referrer", "src",
    "tr", "trx",
];

/// 可以直接作为商品ID的查询参数
const ID_PARAMS: &[&str] = &["id", "nvmid", "productid", "catalogid"];

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 以页面地址为基准解析链接，无法解析时原样返回
pub fn absolutize(base: Option<&Url>, href: &str) -> String {
    let href = href.trim();
    match base {
        Some(base) => resolve_url(base, href)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.to_string()),
        None => href.to_string(),
    }
}

/// 从商品URL派生稳定的商品ID
///
/// 优先使用已知的路径模式 `/products/<digits>` 或查询参数 `id=<digits>`；
/// 都不存在时对去除跟踪参数后的URL做哈希，保证同一商品重复抓取得到相同ID。
pub fn derive_product_id(product_url: &str) -> String {
    if let Some(id) = native_product_id(product_url) {
        return id;
    }
    format!("h{}", stable_hash(&canonical_url(product_url)))
}

/// 从URL中提取原生商品ID
pub fn native_product_id(product_url: &str) -> Option<String> {
    if let Some(id) = digits_after(product_url, "/products/") {
        return Some(id);
    }

    let parsed = Url::parse(product_url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, value)| {
            ID_PARAMS.contains(&key.to_ascii_lowercase().as_str())
                && !value.is_empty()
                && value.chars().all(|c| c.is_ascii_digit())
        })
        .map(|(_, value)| value.into_owned())
}

/// 对任意文本计算短的稳定哈希（SHA-256 前 16 位十六进制）
pub fn stable_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(HASH_ID_LEN);
    encoded
}

/// 规范化URL：去掉片段、跟踪参数，并对剩余参数排序
pub fn canonical_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw.trim()) else {
        return raw.trim().to_string();
    };
    parsed.set_fragment(None);

    let mut kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    kept.sort();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }
    parsed.to_string()
}

/// 提取URL查询参数（用于诊断元数据）
pub fn query_params(raw: &str) -> BTreeMap<String, String> {
    Url::parse(raw)
        .map(|u| {
            u.query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default()
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

fn digits_after(haystack: &str, marker: &str) -> Option<String> {
    let start = haystack.find(marker)? + marker.len();
    let digits: String = haystack[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    (!digits.is_empty()).then_some(digits)
}
