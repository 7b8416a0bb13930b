// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::BrowserSettings;
use crate::domain::models::captured_page::CapturedPage;
use crate::engines::block_detection::detect_block;
use crate::engines::signals::collect_signals;
use crate::engines::stealth::{build_profile, UserAgentPool};
use crate::engines::traits::{
    BrowserBackend, BrowsingContext, CaptureError, CaptureOptions, PageCapturer,
};
use async_trait::async_trait;
use chrono::Utc;
use metrics::{counter, histogram};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// 页面捕获控制器
///
/// 独占持有浏览器后端，每次捕获打开一个隔离的浏览上下文，
/// 并保证该上下文在成功、拦截和错误路径上都恰好关闭一次。
pub struct CaptureController<B: BrowserBackend> {
    backend: B,
    settings: BrowserSettings,
    user_agents: UserAgentPool,
    initialized: Mutex<bool>,
}

impl<B: BrowserBackend> CaptureController<B> {
    pub fn new(backend: B, settings: BrowserSettings) -> Self {
        let user_agents = UserAgentPool::new(settings.user_agents.clone());
        Self {
            backend,
            settings,
            user_agents,
            initialized: Mutex::new(false),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 在已打开的上下文中完成一次捕获
    async fn drive(
        &self,
        context: &mut B::Context,
        url: &str,
        options: &CaptureOptions,
    ) -> Result<CapturedPage, CaptureError> {
        bounded(url, options.navigation_timeout, context.navigate(url)).await?;

        if !options.settle.is_zero() {
            tokio::time::sleep(options.settle).await;
        }

        // 导航之后的每个步骤共用导航超时作为上限
        let step = options.navigation_timeout;
        if options.simulate_scroll {
            if let Err(e) = bounded(url, step, context.scroll()).await {
                debug!("Scroll simulation failed for {}: {}", url, e);
            }
        }

        let body_text = bounded(url, step, context.body_text()).await?;
        let title = bounded(url, step, context.title()).await?;
        let raw_html = bounded(url, step, context.html()).await?;

        let block_reason = detect_block(&body_text, &title);
        let signals = collect_signals(&raw_html);

        Ok(CapturedPage {
            url: url.to_string(),
            title,
            raw_html,
            captured_at: Utc::now(),
            is_blocked: block_reason.is_some(),
            block_reason: block_reason.map(str::to_string),
            body_length: body_text.chars().count(),
            signals,
        })
    }
}

/// 以超时包裹一个浏览器步骤
async fn bounded<T, F>(url: &str, timeout: Duration, step: F) -> Result<T, CaptureError>
where
    F: Future<Output = Result<T, CaptureError>>,
{
    tokio::time::timeout(timeout, step)
        .await
        .map_err(|_| CaptureError::Timeout {
            url: url.to_string(),
            timeout,
        })?
}

#[async_trait]
impl<B: BrowserBackend> PageCapturer for CaptureController<B> {
    async fn initialize(&self) -> Result<(), CaptureError> {
        let mut initialized = self.initialized.lock().await;
        if *initialized {
            debug!("Browser backend {} already initialized", self.backend.name());
            return Ok(());
        }

        self.backend.launch().await?;
        *initialized = true;
        info!("Browser backend {} initialized", self.backend.name());
        Ok(())
    }

    async fn capture_page(&self, url: &str, options: &CaptureOptions) -> Result<CapturedPage, CaptureError> {
        if !*self.initialized.lock().await {
            return Err(CaptureError::NotInitialized);
        }

        let started = Instant::now();
        let profile = build_profile(&self.settings, &self.user_agents, options.block_images);
        let mut context = self.backend.open_context(&profile).await?;
        debug!("Opened browsing context for {} (ua: {})", url, profile.user_agent);

        let outcome = self.drive(&mut context, url, options).await;

        if let Err(e) = context.close().await {
            warn!("Failed to close browsing context for {}: {}", url, e);
        }
        counter!("capture_contexts_closed_total").increment(1);
        drop(context);

        let label = match &outcome {
            Ok(page) if page.is_blocked => "blocked",
            Ok(_) => "ok",
            Err(_) => "error",
        };
        counter!("capture_pages_total", "outcome" => label).increment(1);
        histogram!("capture_duration_seconds").record(started.elapsed().as_secs_f64());

        match &outcome {
            Ok(page) if page.is_blocked => warn!(
                "Page {} looks blocked ({}), body length {}",
                url,
                page.block_reason.as_deref().unwrap_or("unknown"),
                page.body_length
            ),
            Ok(page) => debug!(
                "Captured {} in {:?}: {} bytes html, {} chars text",
                url,
                started.elapsed(),
                page.raw_html.len(),
                page.body_length
            ),
            Err(e) => warn!("Capture of {} failed: {}", url, e),
        }

        outcome
    }

    async fn close(&self) -> Result<(), CaptureError> {
        let mut initialized = self.initialized.lock().await;
        if !*initialized {
            return Ok(());
        }
        *initialized = false;
        let result = self.backend.shutdown().await;
        info!("Browser backend {} closed", self.backend.name());
        result
    }

    async fn is_initialized(&self) -> bool {
        *self.initialized.lock().await
    }
}
