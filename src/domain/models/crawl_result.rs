// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::captured_page::CapturedPage;
use crate::domain::models::record::{NormalizedRecord, Product};
use crate::domain::models::target::CrawlTarget;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// 单个目标的处理阶段
///
/// Idle → Initializing → Capturing → BlockCheck → Extracting → Persisting → Done，
/// 任一阶段失败时结果停留在该阶段并标记为失败
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStage {
    #[default]
    Idle,
    Initializing,
    Capturing,
    BlockCheck,
    Extracting,
    Persisting,
    Done,
}

impl fmt::Display for CrawlStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            CrawlStage::Idle => "idle",
            CrawlStage::Initializing => "initializing",
            CrawlStage::Capturing => "capturing",
            CrawlStage::BlockCheck => "block_check",
            CrawlStage::Extracting => "extracting",
            CrawlStage::Persisting => "persisting",
            CrawlStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// 分类/店铺/关键词去重统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rollup {
    pub categories: BTreeSet<String>,
    pub malls: BTreeSet<String>,
    pub keywords: BTreeSet<String>,
}

impl Rollup {
    /// 从一组记录统计
    pub fn from_records(records: &[NormalizedRecord]) -> Self {
        let mut rollup = Rollup::default();
        for record in records {
            rollup.observe(record);
        }
        rollup
    }

    fn observe(&mut self, record: &NormalizedRecord) {
        match record {
            NormalizedRecord::Product(p) => self.observe_product(p),
            NormalizedRecord::RankedKeyword(k) => {
                insert_non_empty(&mut self.categories, &k.category);
                insert_non_empty(&mut self.keywords, &k.keyword);
                k.related_products.iter().for_each(|p| self.observe_product(p));
            }
            NormalizedRecord::CategoryGroup(g) => {
                insert_non_empty(&mut self.categories, &g.category_name);
                g.products.iter().for_each(|p| self.observe_product(p));
            }
        }
    }

    fn observe_product(&mut self, product: &Product) {
        insert_non_empty(&mut self.categories, &product.category);
        insert_non_empty(&mut self.malls, &product.mall_name);
    }

    /// 合并整个批次的统计
    pub fn merge_all<'a>(rollups: impl IntoIterator<Item = &'a Rollup>) -> Rollup {
        let mut merged = Rollup::default();
        for r in rollups {
            merged.categories.extend(r.categories.iter().cloned());
            merged.malls.extend(r.malls.iter().cloned());
            merged.keywords.extend(r.keywords.iter().cloned());
        }
        merged
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn mall_count(&self) -> usize {
        self.malls.len()
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }
}

fn insert_non_empty(set: &mut BTreeSet<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        set.insert(value.to_string());
    }
}

/// 单个目标的抓取结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    pub success: bool,
    pub url: String,
    pub target: CrawlTarget,
    pub record_count: usize,
    pub saved_count: usize,
    /// 失败原因与持久化警告
    pub errors: Vec<String>,
    pub processing_time_ms: u64,
    /// 原始捕获页面，用于审计
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<CapturedPage>,
    /// 产出记录的提取策略
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default)]
    pub records: Vec<NormalizedRecord>,
    #[serde(default)]
    pub rollup: Rollup,
    /// 最后到达的阶段
    pub stage: CrawlStage,
}

impl CrawlResult {
    /// 创建一个尚未开始处理的结果
    pub fn pending(target: CrawlTarget) -> Self {
        Self {
            success: false,
            url: String::new(),
            target,
            record_count: 0,
            saved_count: 0,
            errors: Vec::new(),
            processing_time_ms: 0,
            page: None,
            strategy: None,
            records: Vec::new(),
            rollup: Rollup::default(),
            stage: CrawlStage::Idle,
        }
    }

    /// 页面是否被拦截
    pub fn is_blocked(&self) -> bool {
        self.page.as_ref().is_some_and(|p| p.is_blocked)
    }
}
