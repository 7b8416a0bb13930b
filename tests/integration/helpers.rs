// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 集成测试辅助
//!
//! 以固定HTML响应的伪浏览器后端，统计打开与关闭的上下文数量

use async_trait::async_trait;
use scraper::Html;
use shopcrawl::config::settings::Settings;
use shopcrawl::engines::traits::{BrowserBackend, BrowsingContext, CaptureError, ContextProfile};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const KEYWORD_RANKING_TEXT: &str = include_str!("../fixtures/keyword_ranking_text.html");
pub const LISTING_HASHED: &str = include_str!("../fixtures/listing_hashed.html");
pub const CATEGORY_BEST_PAYLOAD: &str = include_str!("../fixtures/category_best_payload.html");
pub const BLOCKED: &str = include_str!("../fixtures/blocked.html");

/// 伪后端对某个URL的响应
#[derive(Debug, Clone)]
pub enum Response {
    Html(&'static str),
    /// 导航永不完成
    Hang,
    NetworkError,
}

#[derive(Default)]
pub struct Counters {
    pub launched: AtomicUsize,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub shutdowns: AtomicUsize,
}

impl Counters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct FixtureBackend {
    routes: Arc<HashMap<String, Response>>,
    pub counters: Arc<Counters>,
}

impl FixtureBackend {
    pub fn new(routes: &[(&str, Response)]) -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let backend = Self {
            routes: Arc::new(
                routes
                    .iter()
                    .map(|(url, response)| (url.to_string(), response.clone()))
                    .collect(),
            ),
            counters: Arc::clone(&counters),
        };
        (backend, counters)
    }
}

pub struct FixtureContext {
    routes: Arc<HashMap<String, Response>>,
    counters: Arc<Counters>,
    current: Option<&'static str>,
}

impl FixtureContext {
    fn document(&self) -> Result<&'static str, CaptureError> {
        self.current
            .ok_or_else(|| CaptureError::Browser("no document loaded".to_string()))
    }
}

#[async_trait]
impl BrowsingContext for FixtureContext {
    async fn navigate(&mut self, url: &str) -> Result<(), CaptureError> {
        match self.routes.get(url) {
            Some(Response::Html(html)) => {
                self.current = Some(*html);
                Ok(())
            }
            Some(Response::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
            Some(Response::NetworkError) | None => Err(CaptureError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_REFUSED".to_string(),
            }),
        }
    }

    async fn scroll(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    async fn title(&mut self) -> Result<String, CaptureError> {
        let document = Html::parse_document(self.document()?);
        let selector = scraper::Selector::parse("title")
            .map_err(|e| CaptureError::Script(e.to_string()))?;
        Ok(document
            .select(&selector)
            .next()
            .map(|t| t.text().collect::<String>())
            .unwrap_or_default())
    }

    async fn body_text(&mut self) -> Result<String, CaptureError> {
        let document = Html::parse_document(self.document()?);
        Ok(document.root_element().text().collect::<Vec<_>>().join(" "))
    }

    async fn html(&mut self) -> Result<String, CaptureError> {
        Ok(self.document()?.to_string())
    }

    async fn close(&mut self) -> Result<(), CaptureError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl BrowserBackend for FixtureBackend {
    type Context = FixtureContext;

    async fn launch(&self) -> Result<(), CaptureError> {
        self.counters.launched.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn open_context(&self, _profile: &ContextProfile) -> Result<FixtureContext, CaptureError> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(FixtureContext {
            routes: Arc::clone(&self.routes),
            counters: Arc::clone(&self.counters),
            current: None,
        })
    }

    async fn shutdown(&self) -> Result<(), CaptureError> {
        self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

/// 测试配置：无稳定等待，无节奏抖动，短导航超时
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.browser.settle_ms = 0;
    settings.browser.navigation_timeout_secs = 5;
    settings.crawl.pacing_jitter_ms = 0;
    settings.crawl.max_block_retries = 0;
    settings.crawl.owner_id = "integration".to_string();
    settings
}
