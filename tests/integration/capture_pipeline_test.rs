// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{test_settings, FixtureBackend, Response, BLOCKED, LISTING_HASHED};
use shopcrawl::domain::models::crawl_result::CrawlStage;
use shopcrawl::domain::models::target::{CrawlTarget, SourceFamily};
use shopcrawl::domain::services::batch_analyzer::analyze_batch;
use shopcrawl::domain::services::crawl_orchestrator::CrawlOrchestrator;
use shopcrawl::engines::capture_controller::CaptureController;
use shopcrawl::engines::traits::PageCapturer;
use shopcrawl::extractors::ExtractionEngine;
use shopcrawl::infrastructure::diagnostics::DiagnosticSink;
use shopcrawl::infrastructure::record_store::InMemoryRecordStore;
use shopcrawl::infrastructure::storage::LocalStorage;
use std::sync::Arc;
use std::time::Duration;

const A: &str = "https://search.example.com/a";
const B: &str = "https://search.example.com/b";
const C: &str = "https://search.example.com/c";

fn listing(url: &str) -> CrawlTarget {
    CrawlTarget::url(url, "캠핑", SourceFamily::Listing)
}

#[tokio::test(start_paused = true)]
async fn test_batch_with_hanging_navigation_keeps_order_and_closes_contexts() {
    let settings = test_settings();
    let (backend, counters) = FixtureBackend::new(&[
        (A, Response::Html(LISTING_HASHED)),
        (B, Response::Hang),
        (C, Response::Html(LISTING_HASHED)),
    ]);
    let capturer = Arc::new(CaptureController::new(backend, settings.browser.clone()));
    let store = Arc::new(InMemoryRecordStore::new());
    let orchestrator = CrawlOrchestrator::new(
        Arc::clone(&capturer),
        Arc::clone(&store),
        Arc::new(ExtractionEngine::default()),
        settings,
    );

    let results = orchestrator
        .crawl_batch(&[listing(A), listing(B), listing(C)], Duration::from_secs(3))
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(
        results.iter().map(|r| r.success).collect::<Vec<_>>(),
        vec![true, false, true]
    );
    assert_eq!(results[1].stage, CrawlStage::Capturing);
    assert!(results[1].errors[0].contains("Timed out"));

    // 每个上下文恰好关闭一次
    assert_eq!(counters.opened(), 3);
    assert_eq!(counters.closed(), 3);

    // 同一页面重复抓取按自然键更新插入
    assert_eq!(results[0].saved_count, 3);
    assert_eq!(store.len(), 3);

    let analysis = analyze_batch(&results);
    assert_eq!(analysis.working_targets, vec![A.to_string(), C.to_string()]);
    assert_eq!(analysis.failed_targets, vec![B.to_string()]);
    assert!(!analysis.drift_suspected);
    assert_eq!(analysis.rollup.mall_count(), 2);

    capturer.close().await.unwrap();
    assert!(!capturer.is_initialized().await);
}

#[tokio::test]
async fn test_blocked_page_is_reported_and_archived() {
    let mut settings = test_settings();
    settings.crawl.persist_diagnostics = true;
    let dir = tempfile::tempdir().unwrap();
    let archive = Arc::new(DiagnosticSink::new(Arc::new(LocalStorage::new(dir.path()))));

    let (backend, counters) = FixtureBackend::new(&[(A, Response::Html(BLOCKED))]);
    let orchestrator = CrawlOrchestrator::new(
        Arc::new(CaptureController::new(backend, settings.browser.clone())),
        Arc::new(InMemoryRecordStore::new()),
        Arc::new(ExtractionEngine::default()),
        settings,
    )
    .with_archive(archive.clone());

    let result = orchestrator.crawl(&listing(A)).await.unwrap();

    assert!(!result.success);
    assert!(result.is_blocked());
    assert_eq!(result.stage, CrawlStage::BlockCheck);
    assert_eq!(counters.closed(), 1);

    let page = result.page.as_ref().unwrap();
    let key = DiagnosticSink::key_for(page);
    let (archived, meta) = archive.load(&key).await.unwrap().unwrap();
    assert_eq!(archived.raw_html, BLOCKED);
    assert!(meta.is_blocked);
    assert_eq!(meta.category, "캠핑");

    let analysis = analyze_batch(&[result]);
    assert_eq!(analysis.blocked_targets, vec![A.to_string()]);
}

#[tokio::test]
async fn test_unreachable_target_does_not_abort_batch() {
    let settings = test_settings();
    let (backend, counters) = FixtureBackend::new(&[
        (A, Response::NetworkError),
        (B, Response::Html(LISTING_HASHED)),
    ]);
    let orchestrator = CrawlOrchestrator::new(
        Arc::new(CaptureController::new(backend, settings.browser.clone())),
        Arc::new(InMemoryRecordStore::new()),
        Arc::new(ExtractionEngine::default()),
        settings,
    );

    let results = orchestrator
        .crawl_batch(&[listing(A), listing(B)], Duration::ZERO)
        .await
        .unwrap();

    assert!(!results[0].success);
    assert!(results[0].errors[0].contains("ERR_CONNECTION_REFUSED"));
    assert!(results[1].success);
    assert_eq!(counters.launched.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(counters.opened(), counters.closed());
}
