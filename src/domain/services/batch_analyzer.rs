// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 批次诊断汇总
//!
//! 根据一批抓取结果判断页面结构是否发生漂移，并从成功捕获的页面信号中
//! 推荐新的结构选择器。

use crate::domain::models::crawl_result::{CrawlResult, Rollup};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 推荐选择器的最大数量
const MAX_SUGGESTIONS: usize = 20;

/// 视为结构化命中的策略，其余策略命中说明精确选择器已失效
const STRUCTURAL_STRATEGIES: &[&str] = &["hashed-class", "exact-class"];

/// 批次诊断结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAnalysis {
    /// 成功并产出记录的目标
    pub working_targets: Vec<String>,
    /// 被拦截的目标
    pub blocked_targets: Vec<String>,
    /// 页面可用但没有任何策略产出记录的目标
    pub empty_targets: Vec<String>,
    /// 导航或提取失败的目标
    pub failed_targets: Vec<String>,
    /// 是否怀疑页面结构漂移
    pub drift_suspected: bool,
    /// 推荐的结构选择器，仅在怀疑漂移时给出
    pub suggested_selectors: Vec<String>,
    /// 整个批次的分类/店铺/关键词统计
    pub rollup: Rollup,
}

/// 汇总一批抓取结果
pub fn analyze_batch(results: &[CrawlResult]) -> BatchAnalysis {
    let mut analysis = BatchAnalysis {
        rollup: Rollup::merge_all(results.iter().map(|r| &r.rollup)),
        ..BatchAnalysis::default()
    };
    let mut fallback_hits = 0;

    for result in results {
        let label = result.target.label().to_string();
        if result.is_blocked() {
            analysis.blocked_targets.push(label);
        } else if !result.success {
            analysis.failed_targets.push(label);
        } else if result.record_count == 0 {
            analysis.empty_targets.push(label);
        } else {
            if result
                .strategy
                .as_deref()
                .is_some_and(|s| !STRUCTURAL_STRATEGIES.contains(&s))
            {
                fallback_hits += 1;
            }
            analysis.working_targets.push(label);
        }
    }

    analysis.drift_suspected = !analysis.empty_targets.is_empty() || fallback_hits > 0;
    if analysis.drift_suspected {
        analysis.suggested_selectors = suggest_selectors(results);
        tracing::warn!(
            "Markup drift suspected: {} empty targets, {} fallback hits, {} selector suggestions",
            analysis.empty_targets.len(),
            fallback_hits,
            analysis.suggested_selectors.len()
        );
    }
    analysis
}

/// 按出现页面数排序的候选选择器
fn suggest_selectors(results: &[CrawlResult]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    let pages = results
        .iter()
        .filter(|r| r.success)
        .filter_map(|r| r.page.as_ref())
        .filter(|p| !p.is_blocked);
    for page in pages {
        for stem in &page.signals.class_candidates {
            *counts.entry(format!("[class*='{}']", stem)).or_default() += 1;
        }
        for id in &page.signals.data_test_ids {
            *counts.entry(format!("[data-testid='{}']", id)).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(selector, _)| selector)
        .collect()
}
