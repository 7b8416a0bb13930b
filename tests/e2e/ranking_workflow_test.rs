// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::integration::helpers::{test_settings, FixtureBackend, Response, KEYWORD_RANKING_TEXT};
use chrono::Utc;
use shopcrawl::domain::models::record::{NormalizedRecord, Trend};
use shopcrawl::domain::models::target::{CrawlTarget, SourceFamily};
use shopcrawl::domain::services::crawl_orchestrator::CrawlOrchestrator;
use shopcrawl::engines::capture_controller::CaptureController;
use shopcrawl::extractors::ExtractionEngine;
use shopcrawl::infrastructure::record_store::InMemoryRecordStore;
use std::sync::Arc;

const TEMPLATE: &str = "https://datalab.example.com/ranking?keyword={keyword}";

/// 关键词目标经模板解析、捕获、正则回退提取、按排名排序后写入存储
#[tokio::test]
async fn test_keyword_ranking_end_to_end() {
    let mut settings = test_settings();
    settings.sources.keyword_ranking_url_template = TEMPLATE.to_string();
    let url = "https://datalab.example.com/ranking?keyword=%EC%83%9D%ED%99%9C";

    let (backend, counters) = FixtureBackend::new(&[(url, Response::Html(KEYWORD_RANKING_TEXT))]);
    let store = Arc::new(InMemoryRecordStore::new());
    let orchestrator = CrawlOrchestrator::new(
        Arc::new(CaptureController::new(backend, settings.browser.clone())),
        Arc::clone(&store),
        Arc::new(ExtractionEngine::default()),
        settings,
    );

    let target = CrawlTarget::keyword("생활", "생활/건강", SourceFamily::KeywordRanking);
    let result = orchestrator.crawl(&target).await.unwrap();

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.url, url);
    assert_eq!(result.strategy.as_deref(), Some("regex-fallback"));
    assert_eq!(result.record_count, 3);
    assert_eq!(counters.closed(), 1);

    let ranked: Vec<(u32, String, Trend)> = result
        .records
        .iter()
        .filter_map(|r| match r {
            NormalizedRecord::RankedKeyword(k) => Some((k.rank, k.keyword.clone(), k.trend)),
            _ => None,
        })
        .collect();
    assert_eq!(
        ranked,
        vec![
            (1, "상품A".to_string(), Trend::Up),
            (2, "상품B".to_string(), Trend::Stable),
            (3, "상품C".to_string(), Trend::Down),
        ]
    );

    assert_eq!(result.rollup.keyword_count(), 3);
    assert_eq!(store.records_for("integration", Utc::now().date_naive()).len(), 3);
    assert_eq!(result.saved_count, 3);
}
