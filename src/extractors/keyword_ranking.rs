// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 关键词排名提取
//!
//! 级联顺序：哈希类名结构匹配 → 历史固定类名 → 内嵌脚本数据 → 通用容器启发式 → 正文正则回退

use crate::domain::models::record::{RankedKeyword, Trend};
use crate::extractors::cascade::{Cascade, ExtractionStrategy};
use crate::extractors::product_card::{product_from_payload, CardTemplate};
use crate::extractors::script_payload::{array_field, find_object_array, find_payloads, has_any, str_field, u64_field};
use crate::extractors::{dom, ExtractionError, PageDocument};
use crate::utils::text_processing::{
    classify_trend, collapse_whitespace, first_number, is_plausible_keyword, is_trend_label, strip_rank_prefix,
};
use regex::Regex;
use std::collections::HashSet;

/// 通用容器至少需要的候选条目数
const MIN_GENERIC_ITEMS: usize = 3;

/// 正文回退使用的正则，按顺序尝试
///
/// 排名前必须是行首或非数字，"1234위" 不会被截成 "234위"
const FALLBACK_PATTERNS: &[&str] = &[
    r"(?:^|[^\d])(\d{1,3})위\s*랭킹\s*(상승|하락|유지|신규|급등)",
    r"(?:^|[^\d])(\d{1,3})위\s*(상승|하락|유지|신규|급등|NEW)",
    r"(?:^|[^\d])(\d{1,3})위",
];

const KEYWORD_KEYS: &[&str] = &["keyword", "keywordName", "query", "searchKeyword"];
const RANK_KEYS: &[&str] = &["rank", "ranking", "rankNo", "order"];
const TREND_CODE_KEYS: &[&str] = &["trend", "rankChange", "rankStatus", "changeType", "status"];
const TREND_TEXT_KEYS: &[&str] = &["trendText", "statusText", "rankChangeText"];
const CATEGORY_KEYS: &[&str] = &["categoryName", "category"];
const PRODUCT_LIST_KEYS: &[&str] = &["products", "productList", "items"];

/// 关键词排名级联
pub fn cascade() -> Cascade<RankedKeyword> {
    Cascade::new("keyword-ranking")
        .with(StructuralRanking::hashed())
        .with(StructuralRanking::exact())
        .with(PayloadRanking)
        .with(GenericContainerRanking)
        .with(RegexFallbackRanking)
}

/// 趋势文本分类，先识别显式代码（如 `NEW`）
fn trend_of(text: &str) -> Trend {
    Trend::from_code(text).unwrap_or_else(|| classify_trend(text))
}

/// 清洗关键词文本，不合格时返回 `None`
///
/// 结构和脚本数据里的关键词字段已与排名分离，数字开头的关键词（"3M 테이프"）原样保留
fn clean_keyword(text: &str) -> Option<String> {
    let keyword = collapse_whitespace(text);
    if is_trend_label(&keyword) || keyword == "랭킹" || !is_plausible_keyword(&keyword) {
        return None;
    }
    Some(keyword)
}

/// 正文行可能带排名前缀，先剥离再清洗
fn clean_listed_keyword(text: &str) -> Option<String> {
    clean_keyword(strip_rank_prefix(text))
}

/// 按关键词去重，保留第一次出现
fn dedupe(records: Vec<RankedKeyword>) -> Vec<RankedKeyword> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.keyword.clone()))
        .collect()
}

fn rank_or_position(rank: Option<u64>, position: usize) -> u32 {
    rank.filter(|r| *r > 0)
        .and_then(|r| u32::try_from(r).ok())
        .unwrap_or(position as u32 + 1)
}

/// 结构化排名模板
struct RankingTemplate {
    item: String,
    rank: String,
    keyword: String,
    status: String,
    category: String,
    related: Option<CardTemplate>,
}

/// 结构选择器策略：条目容器加嵌套子选择器
pub struct StructuralRanking {
    name: &'static str,
    template: RankingTemplate,
}

impl StructuralRanking {
    /// 类名包含稳定词干，容忍构建哈希后缀
    pub fn hashed() -> Self {
        Self {
            name: "hashed-class",
            template: RankingTemplate {
                item: dom::contains_class("keywordRank_item"),
                rank: dom::contains_class("keywordRank_rank"),
                keyword: dom::contains_class("keywordRank_keyword"),
                status: dom::contains_class("keywordRank_status"),
                category: dom::contains_class("keywordRank_category"),
                related: Some(CardTemplate::organic_hashed()),
            },
        }
    }

    /// 历史版本的固定类名
    pub fn exact() -> Self {
        Self {
            name: "exact-class",
            template: RankingTemplate {
                item: "li.rank_item".to_string(),
                rank: ".rank_num".to_string(),
                keyword: ".rank_keyword".to_string(),
                status: ".rank_status".to_string(),
                category: ".rank_category".to_string(),
                related: None,
            },
        }
    }
}

impl ExtractionStrategy<RankedKeyword> for StructuralRanking {
    fn name(&self) -> &'static str {
        self.name
    }

    fn try_extract(&self, document: &PageDocument) -> Result<Vec<RankedKeyword>, ExtractionError> {
        let t = &self.template;
        let item = dom::selector(&t.item)?;
        let rank = dom::selector(&t.rank)?;
        let keyword = dom::selector(&t.keyword)?;
        let status = dom::selector(&t.status)?;
        let category = dom::selector(&t.category)?;
        let related = t.related.as_ref().map(CardTemplate::compile).transpose()?;

        let mut records = Vec::new();
        for (position, element) in document.html().select(&item).enumerate() {
            let Some(text) = dom::text_in(element, &keyword) else {
                continue;
            };
            let Some(kw) = clean_keyword(&text) else {
                continue;
            };

            let rank_value = dom::full_text_in(element, &rank).and_then(|t| first_number(&t));
            let status_text = dom::full_text_in(element, &status).unwrap_or_default();
            let item_category = dom::text_in(element, &category)
                .unwrap_or_else(|| document.category().to_string());

            let mut record = RankedKeyword::new(rank_or_position(rank_value, position), kw, item_category.clone())
                .with_trend(trend_of(&status_text), status_text);
            if let Some(cards) = &related {
                record.related_products = cards.parse_all(element, document, &item_category);
            }
            records.push(record);
        }

        Ok(dedupe(records))
    }
}

/// 内嵌脚本数据策略
pub struct PayloadRanking;

fn looks_like_keyword(obj: &serde_json::Map<String, serde_json::Value>) -> bool {
    has_any(obj, KEYWORD_KEYS)
}

fn payload_trend(obj: &serde_json::Map<String, serde_json::Value>) -> (Trend, String) {
    let text = str_field(obj, TREND_TEXT_KEYS).unwrap_or_default();
    if let Some(code) = str_field(obj, TREND_CODE_KEYS) {
        if let Some(trend) = Trend::from_code(&code) {
            let text = if text.is_empty() { code } else { text };
            return (trend, text);
        }
        if let Ok(delta) = code.parse::<i64>() {
            let trend = match delta {
                d if d > 0 => Trend::Up,
                d if d < 0 => Trend::Down,
                _ => Trend::Stable,
            };
            return (trend, text);
        }
        if text.is_empty() {
            return (trend_of(&code), code);
        }
    }
    (trend_of(&text), text)
}

impl ExtractionStrategy<RankedKeyword> for PayloadRanking {
    fn name(&self) -> &'static str {
        "script-payload"
    }

    fn try_extract(&self, document: &PageDocument) -> Result<Vec<RankedKeyword>, ExtractionError> {
        for payload in find_payloads(document)? {
            let Some(items) = find_object_array(&payload, looks_like_keyword) else {
                continue;
            };

            let mut records = Vec::new();
            for (position, obj) in items.iter().enumerate() {
                let Some(keyword) = str_field(obj, KEYWORD_KEYS).and_then(|k| clean_keyword(&k)) else {
                    continue;
                };
                let category = str_field(obj, CATEGORY_KEYS).unwrap_or_else(|| document.category().to_string());
                let (trend, trend_text) = payload_trend(obj);

                let mut record = RankedKeyword::new(rank_or_position(u64_field(obj, RANK_KEYS), position), keyword, category.clone())
                    .with_trend(trend, trend_text);
                record.related_products = array_field(obj, PRODUCT_LIST_KEYS)
                    .into_iter()
                    .filter_map(|p| product_from_payload(p, document, &category))
                    .collect();
                records.push(record);
            }

            let records = dedupe(records);
            if !records.is_empty() {
                return Ok(records);
            }
        }
        Ok(Vec::new())
    }
}

/// 通用容器启发式：类名提示为关键词/排名/榜单的容器，逐个校验子元素
pub struct GenericContainerRanking;

impl GenericContainerRanking {
    fn candidates(container: scraper::ElementRef<'_>, category: &str) -> Vec<RankedKeyword> {
        let mut records = Vec::new();
        for (position, child) in container.child_elements().enumerate() {
            let lines = dom::element_lines(child);
            let Some(keyword) = lines.iter().find_map(|l| clean_listed_keyword(l)) else {
                continue;
            };
            let rank = lines
                .first()
                .filter(|l| l.starts_with(|c: char| c.is_ascii_digit()))
                .and_then(|l| first_number(l));
            let trend_text = lines
                .iter()
                .find(|l| is_trend_label(l) || Trend::from_code(l).is_some())
                .cloned()
                .unwrap_or_default();

            records.push(
                RankedKeyword::new(rank_or_position(rank, position), keyword, category)
                    .with_trend(trend_of(&trend_text), trend_text),
            );
        }
        dedupe(records)
    }
}

impl ExtractionStrategy<RankedKeyword> for GenericContainerRanking {
    fn name(&self) -> &'static str {
        "generic-container"
    }

    fn try_extract(&self, document: &PageDocument) -> Result<Vec<RankedKeyword>, ExtractionError> {
        let containers = dom::selector(&format!(
            "{}, {}, {}",
            dom::contains_class("keyword"),
            dom::contains_class("rank"),
            dom::contains_class("chart")
        ))?;

        let best = document
            .html()
            .select(&containers)
            .map(|c| Self::candidates(c, document.category()))
            .filter(|records| records.len() >= MIN_GENERIC_ITEMS)
            .max_by_key(Vec::len);

        Ok(best.unwrap_or_default())
    }
}

/// 正文正则回退
///
/// 把文本节点按行拼接，用排名锚点切分；锚点之后的第一行合格文本即为关键词
pub struct RegexFallbackRanking;

impl ExtractionStrategy<RankedKeyword> for RegexFallbackRanking {
    fn name(&self) -> &'static str {
        "regex-fallback"
    }

    fn try_extract(&self, document: &PageDocument) -> Result<Vec<RankedKeyword>, ExtractionError> {
        let text = dom::text_lines(document.html()).join("\n");

        for pattern in FALLBACK_PATTERNS {
            let regex = Regex::new(pattern)?;
            let anchors: Vec<_> = regex.captures_iter(&text).collect();
            if anchors.is_empty() {
                continue;
            }

            let mut records = Vec::new();
            for (i, caps) in anchors.iter().enumerate() {
                let Some(anchor) = caps.get(0) else {
                    continue;
                };
                let segment_end = anchors
                    .get(i + 1)
                    .and_then(|next| next.get(0))
                    .map(|m| m.start())
                    .unwrap_or(text.len());
                let segment = &text[anchor.end()..segment_end];

                let Some(keyword) = segment.lines().find_map(clean_listed_keyword) else {
                    continue;
                };
                let rank = caps.get(1).and_then(|m| first_number(m.as_str()));
                let trend_text = match caps.get(2) {
                    Some(m) => m.as_str().to_string(),
                    None => segment
                        .lines()
                        .map(str::trim)
                        .find(|l| is_trend_label(l))
                        .unwrap_or_default()
                        .to_string(),
                };

                records.push(
                    RankedKeyword::new(rank_or_position(rank, i), keyword, document.category())
                        .with_trend(trend_of(&trend_text), trend_text),
                );
            }

            let records = dedupe(records);
            if !records.is_empty() {
                return Ok(records);
            }
        }
        Ok(Vec::new())
    }
}
