// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::captured_page::PageSignals;
use scraper::{Html, Selector};
use std::collections::HashMap;

/// 每类信号最多保留的条目数
const MAX_SIGNALS: usize = 40;

/// 候选类名需包含的提示词（小写比较）
const CLASS_HINTS: &[&str] = &[
    "product", "item", "rank", "keyword", "price", "mall", "category", "best", "adproduct", "list",
    "card", "chart",
];

/// 购物相关链接的特征
const SHOPPING_LINK_HINTS: &[&str] = &[
    "shopping.",
    "smartstore.",
    "brand.",
    "/products/",
    "/catalog/",
    "adcr.",
];

/// 去掉构建工具附加的哈希后缀，如 `product_item__MDtDF` → `product_item`
pub fn class_stem(class: &str) -> &str {
    match class.split_once("__") {
        Some((stem, suffix))
            if !stem.is_empty()
                && (4..=10).contains(&suffix.len())
                && suffix.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
        {
            stem
        }
        _ => class,
    }
}

/// 从渲染后的HTML收集诊断信号
///
/// 只用于选择器发现，解析失败的部分被忽略
pub fn collect_signals(html: &str) -> PageSignals {
    let document = Html::parse_document(html);
    let mut test_ids: HashMap<String, usize> = HashMap::new();
    let mut stems: HashMap<String, usize> = HashMap::new();
    let mut links: Vec<String> = Vec::new();

    for element in document.root_element().descendants().filter_map(scraper::ElementRef::wrap) {
        let value = element.value();

        if let Some(id) = value.attr("data-testid").or_else(|| value.attr("data-test-id")) {
            let id = id.trim();
            if !id.is_empty() {
                *test_ids.entry(id.to_string()).or_default() += 1;
            }
        }

        for class in value.classes() {
            let stem = class_stem(class);
            let lower = stem.to_ascii_lowercase();
            if CLASS_HINTS.iter().any(|hint| lower.contains(hint)) {
                *stems.entry(stem.to_string()).or_default() += 1;
            }
        }
    }

    if let Ok(anchor) = Selector::parse("a[href]") {
        for a in document.select(&anchor) {
            let Some(href) = a.value().attr("href") else {
                continue;
            };
            if SHOPPING_LINK_HINTS.iter().any(|hint| href.contains(hint))
                && links.len() < MAX_SIGNALS
                && !links.iter().any(|l| l == href)
            {
                links.push(href.to_string());
            }
        }
    }

    PageSignals {
        data_test_ids: by_frequency(test_ids),
        class_candidates: by_frequency(stems),
        shopping_links: links,
    }
}

/// 按出现次数降序、名称升序排列并截断
fn by_frequency(counts: HashMap<String, usize>) -> Vec<String> {
    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.into_iter().take(MAX_SIGNALS).map(|(name, _)| name).collect()
}
