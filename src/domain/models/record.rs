// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::url_utils::derive_product_id;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 关键词排名趋势
///
/// 文本分类只会产生 `Up`/`Down`/`Stable`/`New`，
/// `Jump` 仅在内嵌脚本数据中显式给出趋势代码时出现。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// 上升
    Up,
    /// 下降
    Down,
    /// 持平
    #[default]
    Stable,
    /// 新进入
    New,
    /// 急升
    Jump,
}

impl Trend {
    /// 从内嵌数据的趋势代码解析（如 `"UP"`、`"KEEP"`、`"NEW"`）
    ///
    /// 无法识别的代码返回 `None`，由调用方回退到文本分类
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "up" | "rise" | "increase" => Some(Trend::Up),
            "down" | "fall" | "decrease" => Some(Trend::Down),
            "stable" | "keep" | "same" | "stay" | "none" => Some(Trend::Stable),
            "new" => Some(Trend::New),
            "jump" | "surge" => Some(Trend::Jump),
            _ => None,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Trend::Up => write!(f, "up"),
            Trend::Down => write!(f, "down"),
            Trend::Stable => write!(f, "stable"),
            Trend::New => write!(f, "new"),
            Trend::Jump => write!(f, "jump"),
        }
    }
}

impl FromStr for Trend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Trend::from_code(s).ok_or(())
    }
}

/// 商品记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// 商品ID，原生ID或由商品URL派生的稳定哈希，永不为空
    pub product_id: String,
    pub name: String,
    /// 价格，无法解析时为 0
    pub price: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<u8>,
    pub image_url: String,
    pub mall_name: String,
    /// 店铺链接，广告卡片通常不提供
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mall_url: Option<String>,
    pub product_url: String,
    pub category: String,
    pub is_ad: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_fee: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
}

impl Product {
    /// 创建商品记录，商品ID由URL派生
    ///
    /// URL 为空时以名称和分类派生，保证ID非空且稳定
    pub fn new(name: impl Into<String>, product_url: impl Into<String>, category: impl Into<String>) -> Self {
        let name = name.into();
        let product_url = product_url.into();
        let category = category.into();
        let product_id = if product_url.trim().is_empty() {
            derive_product_id(&format!("name:{}:{}", category, name))
        } else {
            derive_product_id(&product_url)
        };

        Self {
            product_id,
            name,
            price: 0,
            original_price: None,
            discount_rate: None,
            image_url: String::new(),
            mall_name: String::new(),
            mall_url: None,
            product_url,
            category,
            is_ad: false,
            delivery_fee: None,
            review_count: None,
            rating: None,
        }
    }

    /// 使用内嵌数据中给出的原生ID覆盖派生ID
    pub fn with_native_id(mut self, id: &str) -> Self {
        let id = id.trim();
        if !id.is_empty() {
            self.product_id = id.to_string();
        }
        self
    }
}

/// 排名关键词记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedKeyword {
    /// 排名，从 1 开始
    pub rank: u32,
    pub keyword: String,
    pub category: String,
    pub trend: Trend,
    /// 页面上的原始趋势文本
    pub trend_text: String,
    #[serde(default)]
    pub related_products: Vec<Product>,
}

impl RankedKeyword {
    pub fn new(rank: u32, keyword: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            rank: rank.max(1),
            keyword: keyword.into(),
            category: category.into(),
            trend: Trend::Stable,
            trend_text: String::new(),
            related_products: Vec::new(),
        }
    }

    pub fn with_trend(mut self, trend: Trend, trend_text: impl Into<String>) -> Self {
        self.trend = trend;
        self.trend_text = trend_text.into();
        self
    }
}

/// 分类最佳商品分组
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryGroup {
    pub category_id: String,
    pub category_name: String,
    pub product_count: usize,
    pub products: Vec<Product>,
}

impl CategoryGroup {
    /// 创建分组，`product_count` 与商品列表保持一致
    pub fn new(category_id: impl Into<String>, category_name: impl Into<String>, products: Vec<Product>) -> Self {
        Self {
            category_id: category_id.into(),
            category_name: category_name.into(),
            product_count: products.len(),
            products,
        }
    }
}

/// 规范化记录
///
/// 流水线的结构化输出单元，序列化时以 `type` 字段区分变体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NormalizedRecord {
    Product(Product),
    RankedKeyword(RankedKeyword),
    CategoryGroup(CategoryGroup),
}

impl NormalizedRecord {
    /// 去重与更新插入使用的自然键
    ///
    /// 商品按商品ID，关键词按分类加关键词文本，分组按分类ID
    pub fn natural_key(&self) -> String {
        match self {
            NormalizedRecord::Product(p) => format!("product:{}", p.product_id),
            NormalizedRecord::RankedKeyword(k) => format!("keyword:{}:{}", k.category, k.keyword),
            NormalizedRecord::CategoryGroup(g) => format!("category:{}", g.category_id),
        }
    }

    /// 记录类型名称
    pub fn kind(&self) -> &'static str {
        match self {
            NormalizedRecord::Product(_) => "product",
            NormalizedRecord::RankedKeyword(_) => "rankedKeyword",
            NormalizedRecord::CategoryGroup(_) => "categoryGroup",
        }
    }

    /// 排名记录的排名，其余类型为 `None`
    pub fn rank(&self) -> Option<u32> {
        match self {
            NormalizedRecord::RankedKeyword(k) => Some(k.rank),
            _ => None,
        }
    }
}

impl From<Product> for NormalizedRecord {
    fn from(value: Product) -> Self {
        NormalizedRecord::Product(value)
    }
}

impl From<RankedKeyword> for NormalizedRecord {
    fn from(value: RankedKeyword) -> Self {
        NormalizedRecord::RankedKeyword(value)
    }
}

impl From<CategoryGroup> for NormalizedRecord {
    fn from(value: CategoryGroup) -> Self {
        NormalizedRecord::CategoryGroup(value)
    }
}
