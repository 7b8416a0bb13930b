// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// - 抓取目标（target）：关键词或URL，附带分类与来源类别
/// - 捕获页面（captured_page）：一次导航的原始结果
/// - 规范化记录（record）：商品、排名关键词与分类分组
/// - 抓取结果（crawl_result）：每个目标一条，供调用方汇报
pub mod captured_page;
pub mod crawl_result;
pub mod record;
pub mod target;

pub use captured_page::{CapturedPage, PageSignals};
pub use crawl_result::{CrawlResult, CrawlStage, Rollup};
pub use record::{CategoryGroup, NormalizedRecord, Product, RankedKeyword, Trend};
pub use target::{CrawlTarget, SourceFamily, TargetError, TargetQuery};
