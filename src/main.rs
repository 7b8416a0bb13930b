// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Context;
use serde_json::json;
use shopcrawl::config::settings::Settings;
use shopcrawl::domain::models::target::CrawlTarget;
use shopcrawl::domain::services::batch_analyzer::analyze_batch;
use shopcrawl::domain::services::crawl_orchestrator::CrawlOrchestrator;
use shopcrawl::engines::capture_controller::CaptureController;
use shopcrawl::engines::chromium_backend::ChromiumBackend;
use shopcrawl::engines::traits::PageCapturer;
use shopcrawl::extractors::ExtractionEngine;
use shopcrawl::infrastructure::diagnostics::DiagnosticSink;
use shopcrawl::infrastructure::record_store::InMemoryRecordStore;
use shopcrawl::infrastructure::storage::create_storage_repository;
use shopcrawl::utils::telemetry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 主函数
///
/// 读取目标文件，串行抓取全部目标并以 JSON 输出结果与批次诊断
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();

    // 2. Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    if settings.metrics.enabled {
        shopcrawl::infrastructure::metrics::init_metrics(&settings.metrics.listen_addr)?;
    }

    // 3. Load targets
    let path = std::env::args()
        .nth(1)
        .context("usage: shopcrawl <targets.json>")?;
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {}", path))?;
    let targets: Vec<CrawlTarget> =
        serde_json::from_str(&raw).with_context(|| format!("invalid targets file {}", path))?;
    info!("Loaded {} targets from {}", targets.len(), path);

    // 4. Wire the pipeline
    let capturer = Arc::new(CaptureController::new(
        ChromiumBackend::new(settings.browser.clone()),
        settings.browser.clone(),
    ));
    let sink = Arc::new(InMemoryRecordStore::new());
    let mut orchestrator = CrawlOrchestrator::new(
        Arc::clone(&capturer),
        Arc::clone(&sink),
        Arc::new(ExtractionEngine::default()),
        settings.clone(),
    );
    if settings.crawl.persist_diagnostics {
        let storage = create_storage_repository(&settings.storage)?;
        orchestrator = orchestrator.with_archive(Arc::new(DiagnosticSink::new(Arc::from(storage))));
    }

    // 5. Run
    let outcome = orchestrator
        .crawl_batch(&targets, Duration::from_millis(settings.crawl.pacing_ms))
        .await;

    if let Err(e) = capturer.close().await {
        warn!("Failed to close browser: {}", e);
    }
    let results = outcome?;

    let analysis = analyze_batch(&results);
    info!(
        "{} records stored for {}",
        sink.len(),
        settings.crawl.owner_id
    );

    let output = json!({
        "results": results,
        "analysis": analysis,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
