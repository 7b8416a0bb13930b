// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 提取引擎
//!
//! 每个来源类别对应一条策略级联：精确的结构选择器优先，
//! 宽泛的启发式与正则回退在后。所有策略都只读解析后的文档，
//! 任何策略失败都不会中断级联。

pub mod cascade;
pub mod category_best;
pub mod dom;
pub mod keyword_ranking;
pub mod product_card;
pub mod product_listing;
pub mod script_payload;

use crate::domain::models::record::{CategoryGroup, NormalizedRecord, Product, RankedKeyword};
use crate::domain::models::target::SourceFamily;
use crate::utils::url_utils::absolutize;
use cascade::{Cascade, CascadeOutcome, StrategyAttempt};
use metrics::counter;
use scraper::Html;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// 提取错误类型
///
/// 只在单个策略内部产生，由级联记录后继续下一个策略
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// 选择器无法编译
    #[error("Invalid selector {selector}: {message}")]
    InvalidSelector { selector: String, message: String },
    /// 正则表达式无法编译
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    /// 内嵌数据无法解码
    #[error("Payload error: {0}")]
    Payload(String),
    /// 文档结构不符合预期
    #[error("Unexpected structure: {0}")]
    Structure(String),
}

impl From<regex::Error> for ExtractionError {
    fn from(e: regex::Error) -> Self {
        ExtractionError::InvalidPattern(e.to_string())
    }
}

/// 解析后的页面文档及其上下文
pub struct PageDocument {
    html: Html,
    base_url: Option<Url>,
    category: String,
}

impl PageDocument {
    /// 解析HTML，HTML解析器对任意输入都能产出文档树
    pub fn parse(raw_html: &str, page_url: &str, category: &str) -> Self {
        Self {
            html: Html::parse_document(raw_html),
            base_url: Url::parse(page_url).ok(),
            category: category.trim().to_string(),
        }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// 目标的逻辑分类
    pub fn category(&self) -> &str {
        &self.category
    }

    /// 以页面地址为基准解析链接
    pub fn absolutize(&self, href: &str) -> String {
        absolutize(self.base_url.as_ref(), href)
    }
}

/// 一次提取的结果与诊断
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    pub family: SourceFamily,
    pub records: Vec<NormalizedRecord>,
    /// 产出记录的策略
    pub strategy: Option<String>,
    pub attempts: Vec<StrategyAttempt>,
}

/// 提取引擎，持有三条级联
pub struct ExtractionEngine {
    keyword_ranking: Cascade<RankedKeyword>,
    listing: Cascade<Product>,
    category_best: Cascade<CategoryGroup>,
}

impl Default for ExtractionEngine {
    fn default() -> Self {
        Self {
            keyword_ranking: keyword_ranking::cascade(),
            listing: product_listing::cascade(),
            category_best: category_best::cascade(),
        }
    }
}

impl ExtractionEngine {
    pub fn new(
        keyword_ranking: Cascade<RankedKeyword>,
        listing: Cascade<Product>,
        category_best: Cascade<CategoryGroup>,
    ) -> Self {
        Self {
            keyword_ranking,
            listing,
            category_best,
        }
    }

    /// 从原始HTML提取规范化记录
    ///
    /// # 参数
    ///
    /// * `family` - 页面来源类别，决定使用哪条级联
    /// * `raw_html` - 渲染后的HTML
    /// * `page_url` - 页面地址，用于解析相对链接
    /// * `category` - 目标的逻辑分类
    ///
    /// # 返回值
    ///
    /// 提取报告；没有策略命中时记录为空
    pub fn extract(&self, family: SourceFamily, raw_html: &str, page_url: &str, category: &str) -> ExtractionReport {
        let document = PageDocument::parse(raw_html, page_url, category);

        let report = match family {
            SourceFamily::KeywordRanking => report(family, self.keyword_ranking.run(&document)),
            SourceFamily::Listing => report(family, self.listing.run(&document)),
            SourceFamily::CategoryBest => report(family, self.category_best.run(&document)),
        };

        if let Some(strategy) = &report.strategy {
            counter!(
                "extraction_records_total",
                "family" => family.as_str(),
                "strategy" => strategy.clone()
            )
            .increment(report.records.len() as u64);
        }
        report
    }
}

fn report<T: Into<NormalizedRecord>>(family: SourceFamily, outcome: CascadeOutcome<T>) -> ExtractionReport {
    ExtractionReport {
        family,
        records: outcome.records.into_iter().map(Into::into).collect(),
        strategy: outcome.strategy.map(str::to_string),
        attempts: outcome.attempts,
    }
}
