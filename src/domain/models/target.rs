// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 页面来源类别
///
/// 每个类别对应一条独立的提取级联
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFamily {
    /// 商品列表（搜索结果网格）
    Listing,
    /// 关键词排名
    KeywordRanking,
    /// 分类最佳商品
    CategoryBest,
}

impl SourceFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFamily::Listing => "listing",
            SourceFamily::KeywordRanking => "keyword-ranking",
            SourceFamily::CategoryBest => "category-best",
        }
    }
}

impl fmt::Display for SourceFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 抓取目标的查询内容：关键词或完整URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetQuery {
    Keyword(String),
    Url(String),
}

/// 目标解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("Empty keyword")]
    EmptyKeyword,
    #[error("Empty url")]
    EmptyUrl,
    #[error("URL template has no {{keyword}} placeholder: {0}")]
    MissingPlaceholder(String),
}

/// 抓取目标
///
/// 交给编排器后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlTarget {
    #[serde(flatten)]
    pub query: TargetQuery,
    /// 逻辑分类标签
    #[serde(default)]
    pub category: String,
    pub family: SourceFamily,
}

impl CrawlTarget {
    pub fn keyword(keyword: impl Into<String>, category: impl Into<String>, family: SourceFamily) -> Self {
        Self {
            query: TargetQuery::Keyword(keyword.into()),
            category: category.into(),
            family,
        }
    }

    pub fn url(url: impl Into<String>, category: impl Into<String>, family: SourceFamily) -> Self {
        Self {
            query: TargetQuery::Url(url.into()),
            category: category.into(),
            family,
        }
    }

    /// 用于日志与报告的目标标识
    pub fn label(&self) -> &str {
        match &self.query {
            TargetQuery::Keyword(k) => k,
            TargetQuery::Url(u) => u,
        }
    }

    /// 解析为实际访问的URL
    ///
    /// # 参数
    ///
    /// * `template` - 该来源类别的URL模板，包含 `{keyword}` 占位符
    ///
    /// # 返回值
    ///
    /// 关键词目标返回替换后的URL（关键词经URL编码），URL目标原样返回
    pub fn resolve_url(&self, template: &str) -> Result<String, TargetError> {
        match &self.query {
            TargetQuery::Url(url) => {
                let url = url.trim();
                if url.is_empty() {
                    return Err(TargetError::EmptyUrl);
                }
                Ok(url.to_string())
            }
            TargetQuery::Keyword(keyword) => {
                let keyword = keyword.trim();
                if keyword.is_empty() {
                    return Err(TargetError::EmptyKeyword);
                }
                if !template.contains("{keyword}") {
                    return Err(TargetError::MissingPlaceholder(template.to_string()));
                }
                Ok(template.replace("{keyword}", &urlencoding::encode(keyword)))
            }
        }
    }
}
