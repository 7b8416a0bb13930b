// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::Settings;
use crate::domain::models::captured_page::CapturedPage;
use crate::domain::models::crawl_result::{CrawlResult, CrawlStage, Rollup};
use crate::domain::models::target::{CrawlTarget, SourceFamily};
use crate::domain::repositories::page_archive::PageArchive;
use crate::domain::repositories::record_sink::RecordSink;
use crate::domain::services::pacing::Pacer;
use crate::engines::traits::{CaptureError, CaptureOptions, PageCapturer};
use crate::extractors::ExtractionEngine;
use crate::utils::retry_policy::RetryPolicy;
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// 编排错误
///
/// 只有浏览器无法启动会中止整个运行，其他失败都记录在对应目标的结果中
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Browser failed to start: {0}")]
    BrowserStartup(#[source] CaptureError),
}

/// 抓取编排器
///
/// 串行驱动 捕获 → 拦截检查 → 提取 → 持久化，
/// 每个目标产出一个 [`CrawlResult`]
pub struct CrawlOrchestrator<C: PageCapturer, S: RecordSink> {
    capturer: Arc<C>,
    sink: Arc<S>,
    engine: Arc<ExtractionEngine>,
    settings: Settings,
    archive: Option<Arc<dyn PageArchive>>,
    retry_policy: RetryPolicy,
}

impl<C: PageCapturer, S: RecordSink> CrawlOrchestrator<C, S> {
    /// 创建编排器
    ///
    /// # 参数
    ///
    /// * `capturer` - 页面捕获控制器，由调用方拥有并注入
    /// * `sink` - 持久化协作者
    /// * `engine` - 提取引擎
    /// * `settings` - 应用配置
    pub fn new(capturer: Arc<C>, sink: Arc<S>, engine: Arc<ExtractionEngine>, settings: Settings) -> Self {
        let retry_policy = RetryPolicy::for_blocked_pages(settings.crawl.max_block_retries);
        Self {
            capturer,
            sink,
            engine,
            settings,
            archive: None,
            retry_policy,
        }
    }

    /// 启用捕获页面归档
    pub fn with_archive(mut self, archive: Arc<dyn PageArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn capturer(&self) -> &Arc<C> {
        &self.capturer
    }

    /// 抓取单个目标
    ///
    /// # 返回值
    ///
    /// * `Ok(CrawlResult)` - 目标的处理结果，失败时 `success` 为 `false`
    /// * `Err(OrchestratorError)` - 浏览器无法启动
    pub async fn crawl(&self, target: &CrawlTarget) -> Result<CrawlResult, OrchestratorError> {
        let started = Instant::now();
        let mut result = CrawlResult::pending(target.clone());

        result.stage = CrawlStage::Initializing;
        if !self.capturer.is_initialized().await {
            self.capturer
                .initialize()
                .await
                .map_err(OrchestratorError::BrowserStartup)?;
        }

        let template = self.settings.sources.template_for(target.family);
        let url = match target.resolve_url(template) {
            Ok(url) => url,
            Err(e) => {
                result.errors.push(format!("Invalid target: {}", e));
                return Ok(self.finish(result, started));
            }
        };
        result.url = url.clone();

        let Some(page) = self.capture(&url, target, &mut result).await else {
            return Ok(self.finish(result, started));
        };

        result.stage = CrawlStage::Extracting;
        let engine = Arc::clone(&self.engine);
        let family = target.family;
        let raw_html = page.raw_html.clone();
        let page_url = page.url.clone();
        let category = target.category.clone();
        let extraction =
            tokio::task::spawn_blocking(move || engine.extract(family, &raw_html, &page_url, &category)).await;

        let date = page.date_bucket();
        result.page = Some(page);
        let report = match extraction {
            Ok(report) => report,
            Err(e) => {
                warn!("Extraction aborted for {}: {}", target.label(), e);
                result.errors.push(format!("Extraction failed: {}", e));
                return Ok(self.finish(result, started));
            }
        };

        for attempt in &report.attempts {
            debug!(
                "{} strategy {} -> {} records{}",
                family,
                attempt.name,
                attempt.records,
                attempt.error.as_deref().map(|e| format!(" ({})", e)).unwrap_or_default()
            );
        }

        let mut records = report.records;
        if family == SourceFamily::KeywordRanking {
            records.sort_by_key(|r| r.rank());
        }
        result.strategy = report.strategy;
        result.record_count = records.len();
        result.rollup = Rollup::from_records(&records);
        if records.is_empty() {
            warn!("No strategy produced records for {}", target.label());
            result.errors.push("No records extracted".to_string());
        }

        result.stage = CrawlStage::Persisting;
        if !records.is_empty() {
            match self
                .sink
                .save(&self.settings.crawl.owner_id, date, records.clone())
                .await
            {
                Ok(saved) => {
                    result.saved_count = saved.saved;
                    for error in saved.errors {
                        warn!("Record rejected for {}: {}", target.label(), error);
                        result.errors.push(format!("Persist warning: {}", error));
                    }
                }
                Err(e) => {
                    warn!("Record sink failed for {}: {}", target.label(), e);
                    result.errors.push(format!("Persist warning: {}", e));
                }
            }
        }
        result.records = records;

        result.stage = CrawlStage::Done;
        result.success = true;
        Ok(self.finish(result, started))
    }

    /// 捕获页面并处理拦截重试
    ///
    /// 返回 `None` 时失败原因已写入结果
    async fn capture(&self, url: &str, target: &CrawlTarget, result: &mut CrawlResult) -> Option<CapturedPage> {
        let options = CaptureOptions::from(&self.settings.browser);
        let mut attempt = 0;

        loop {
            result.stage = CrawlStage::Capturing;
            let page = match self.capturer.capture_page(url, &options).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Capture failed for {}: {}", target.label(), e);
                    result.errors.push(e.to_string());
                    return None;
                }
            };

            if self.settings.crawl.persist_diagnostics {
                self.archive_page(&page, target).await;
            }

            result.stage = CrawlStage::BlockCheck;
            if !page.is_blocked {
                return Some(page);
            }

            let reason = page.block_reason.clone().unwrap_or_default();
            if self.retry_policy.should_retry(attempt) {
                attempt += 1;
                let backoff = self.retry_policy.calculate_backoff(attempt);
                warn!(
                    "Blocked on {} ({}), retry {}/{} in {:?}",
                    target.label(),
                    reason,
                    attempt,
                    self.retry_policy.max_retries,
                    backoff
                );
                tokio::time::sleep(backoff).await;
                continue;
            }

            warn!("Blocked on {} ({}), giving up", target.label(), reason);
            result.errors.push(format!("Blocked: {}", reason));
            result.page = Some(page);
            return None;
        }
    }

    async fn archive_page(&self, page: &CapturedPage, target: &CrawlTarget) {
        let Some(archive) = &self.archive else {
            return;
        };
        match archive.archive(page, &target.category).await {
            Ok(key) => debug!("Archived capture of {} to {}", page.url, key),
            Err(e) => warn!("Failed to archive capture of {}: {}", page.url, e),
        }
    }

    fn finish(&self, mut result: CrawlResult, started: Instant) -> CrawlResult {
        let elapsed = started.elapsed();
        result.processing_time_ms = elapsed.as_millis() as u64;

        let outcome = if result.success {
            "success"
        } else if result.is_blocked() {
            "blocked"
        } else {
            "failed"
        };
        counter!("crawl_targets_total", "outcome" => outcome).increment(1);
        histogram!("crawl_duration_seconds").record(elapsed.as_secs_f64());

        if result.success {
            info!(
                "Crawled {} via {}: {} records, {} saved in {}ms",
                result.target.label(),
                result.strategy.as_deref().unwrap_or("none"),
                result.record_count,
                result.saved_count,
                result.processing_time_ms
            );
        } else {
            warn!(
                "Target {} failed at {}: {}",
                result.target.label(),
                result.stage,
                result.errors.join("; ")
            );
        }
        result
    }

    /// 串行抓取一批目标
    ///
    /// 目标按输入顺序处理，下一个目标从上一个目标完成起至少间隔 `pacing`（加抖动）；
    /// 单个目标失败不会中止批次，结果顺序与输入一致
    pub async fn crawl_batch(
        &self,
        targets: &[CrawlTarget],
        pacing: Duration,
    ) -> Result<Vec<CrawlResult>, OrchestratorError> {
        let pacer = Pacer::new(pacing, Duration::from_millis(self.settings.crawl.pacing_jitter_ms));
        let mut results = Vec::with_capacity(targets.len());

        info!("Starting batch of {} targets", targets.len());
        for target in targets {
            pacer.wait_before_request().await;

            let result = self.crawl(target).await?;
            if result.success {
                pacer.record_success().await;
            } else {
                pacer.record_failure().await;
            }
            results.push(result);
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        info!(
            "Batch finished: {}/{} targets succeeded",
            succeeded,
            results.len()
        );
        Ok(results)
    }
}
