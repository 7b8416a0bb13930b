// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 页面诊断信号
///
/// 仅用于诊断和选择器发现，不参与提取
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSignals {
    /// 页面上出现的 `data-testid` 值
    #[serde(default)]
    pub data_test_ids: Vec<String>,
    /// 候选类名词干（去除构建哈希后缀）
    #[serde(default)]
    pub class_candidates: Vec<String>,
    /// 指向购物域名的链接
    #[serde(default)]
    pub shopping_links: Vec<String>,
}

impl PageSignals {
    pub fn is_empty(&self) -> bool {
        self.data_test_ids.is_empty() && self.class_candidates.is_empty() && self.shopping_links.is_empty()
    }
}

/// 一次导航的捕获结果
///
/// 无论是否包含可用数据都会产生，被拦截的页面通过 `is_blocked` 标记
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedPage {
    pub url: String,
    pub title: String,
    /// 渲染后的完整HTML
    pub raw_html: String,
    pub captured_at: DateTime<Utc>,
    /// 是否命中拦截/验证码启发式规则
    pub is_blocked: bool,
    /// 命中的拦截短语
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    /// 正文文本长度（字符数）
    pub body_length: usize,
    #[serde(default)]
    pub signals: PageSignals,
}

impl CapturedPage {
    /// 记录写入时使用的日期分桶
    pub fn date_bucket(&self) -> NaiveDate {
        self.captured_at.date_naive()
    }
}
