// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 文本规范化工具
//!
//! 所有提取器共享的纯函数：价格解析、数量解析、趋势分类与关键词合理性校验。
//! 这些函数永不失败，无法解析时返回安全的默认值。

use crate::domain::models::record::Trend;

/// 关键词最小字符数
pub const MIN_KEYWORD_CHARS: usize = 2;
/// 关键词最大字符数
pub const MAX_KEYWORD_CHARS: usize = 50;

/// 趋势词表，按优先级排列，第一个命中的词生效
const TREND_VOCABULARY: &[(&str, Trend)] = &[
    ("상승", Trend::Up),
    ("급등", Trend::Up),
    ("하락", Trend::Down),
    ("신규", Trend::New),
    ("유지", Trend::Stable),
];

/// 解析价格文本
///
/// 找到第一段由数字和千位分隔符组成的片段并解析；没有数字时返回 0。
///
/// # 示例
///
/// ```
/// use shopcrawl::utils::text_processing::parse_price;
/// assert_eq!(parse_price("₩12,345"), 12345);
/// assert_eq!(parse_price("무료"), 0);
/// ```
pub fn parse_price(text: &str) -> u64 {
    first_number(text).unwrap_or(0)
}

/// 解析文本中的第一个整数（支持千位分隔符），没有数字时返回 `None`
pub fn first_number(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect();

    // Overflowing runs are treated as unparsable
    digits.parse::<u64>().ok()
}

/// 解析评分文本，如 "4.8" 或 "평점 4.75"
pub fn parse_rating(text: &str) -> Option<f32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let number: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    number
        .trim_end_matches('.')
        .parse::<f32>()
        .ok()
        .filter(|r| r.is_finite() && *r >= 0.0)
}

/// 解析折扣率文本，如 "15%"，结果限制在 0-100 之间
pub fn parse_discount_rate(text: &str) -> Option<u8> {
    if !text.contains('%') {
        return None;
    }
    first_number(text).map(|n| n.min(100) as u8)
}

/// 将趋势文本分类为固定的趋势集合
///
/// 按词表顺序做子串匹配，第一个命中的词生效；没有命中时默认为 `Stable`。
pub fn classify_trend(text: &str) -> Trend {
    TREND_VOCABULARY
        .iter()
        .find(|(token, _)| text.contains(token))
        .map(|(_, trend)| *trend)
        .unwrap_or(Trend::Stable)
}

/// 文本是否为趋势标签（如 "랭킹 상승"）
pub fn is_trend_label(text: &str) -> bool {
    let stripped = text.replace("랭킹", "");
    let stripped = stripped.trim();
    TREND_VOCABULARY.iter().any(|(token, _)| stripped == *token)
}

/// 关键词合理性校验
///
/// 长度在界限内、不是纯标点、不是纯数字、至少包含一个字母或韩文字符。
pub fn is_plausible_keyword(text: &str) -> bool {
    let text = text.trim();
    let len = text.chars().count();
    if !(MIN_KEYWORD_CHARS..=MAX_KEYWORD_CHARS).contains(&len) {
        return false;
    }
    if text.chars().all(|c| c.is_ascii_digit() || c.is_whitespace() || c == ',' || c == '.') {
        return false;
    }
    text.chars().any(char::is_alphabetic)
}

/// 合并连续空白为单个空格并去除首尾空白
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 去掉形如 "1위"、"12."、"3 " 的排名前缀
///
/// 数字后必须紧跟 `위`、`.` 或空白才视为排名，"3M 테이프"、"2인용 텐트" 原样返回
pub fn strip_rank_prefix(text: &str) -> &str {
    let trimmed = text.trim_start();
    let digits_end = trimmed
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    if digits_end == 0 {
        return trimmed;
    }

    let rest = &trimmed[digits_end..];
    if let Some(after) = rest.strip_prefix('위') {
        return after.trim_start();
    }
    // "1.5L 생수" 是小数而不是排名
    if let Some(after) = rest.strip_prefix('.').filter(|a| !a.starts_with(|c: char| c.is_ascii_digit())) {
        return after.trim_start();
    }
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        return rest.trim_start();
    }
    trimmed
}
