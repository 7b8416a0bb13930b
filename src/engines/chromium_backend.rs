// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::BrowserSettings;
use crate::engines::stealth::LAUNCH_ARGS;
use crate::engines::traits::{BrowserBackend, BrowsingContext, CaptureError, ContextProfile};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetLocaleOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
    RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// 等待 `document.readyState` 的轮询间隔
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// 模拟滚动的停顿
const SCROLL_PAUSE: Duration = Duration::from_millis(400);

const BODY_TEXT_SCRIPT: &str = "document.body ? document.body.innerText : ''";
const READY_STATE_SCRIPT: &str = "document.readyState";

fn browser_err(e: impl Display) -> CaptureError {
    CaptureError::Browser(e.to_string())
}

struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    /// 连接的远程浏览器不由本进程终止
    remote: bool,
}

type SharedSession = Arc<Mutex<Option<ChromiumSession>>>;

/// 基于 chromiumoxide 的浏览器后端
///
/// 启动本地 Chrome 或连接远程调试地址，每个浏览上下文使用独立的 browser context
pub struct ChromiumBackend {
    settings: BrowserSettings,
    session: SharedSession,
}

impl ChromiumBackend {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            session: Arc::new(Mutex::new(None)),
        }
    }

    async fn start_browser(&self) -> Result<ChromiumSession, CaptureError> {
        let remote_url = self.settings.remote_url();

        let (browser, mut handler) = if let Some(ref url) = remote_url {
            info!("Connecting to remote Chrome instance at: {}", url);
            Browser::connect(url)
                .await
                .map_err(|e| CaptureError::Launch(format!("Failed to connect to remote Chrome: {}", e)))?
        } else {
            let mut builder = BrowserConfig::builder()
                .no_sandbox()
                .request_timeout(self.settings.navigation_timeout())
                .window_size(self.settings.viewport_width, self.settings.viewport_height);

            if !self.settings.headless {
                builder = builder.with_head();
            }
            if let Some(path) = &self.settings.executable_path {
                builder = builder.chrome_executable(path);
            }
            for arg in LAUNCH_ARGS {
                builder = builder.arg(*arg);
            }
            builder = builder.arg(format!("--lang={}", self.settings.locale));

            let config = builder.build().map_err(CaptureError::Launch)?;
            Browser::launch(config)
                .await
                .map_err(|e| CaptureError::Launch(e.to_string()))?
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    trace!("Browser handler event error: {}", e);
                }
            }
            debug!("Browser handler task completed");
        });

        Ok(ChromiumSession {
            browser,
            handler,
            remote: remote_url.is_some(),
        })
    }
}

#[async_trait]
impl BrowserBackend for ChromiumBackend {
    type Context = ChromiumContext;

    async fn launch(&self) -> Result<(), CaptureError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Ok(());
        }
        *session = Some(self.start_browser().await?);
        Ok(())
    }

    async fn open_context(&self, profile: &ContextProfile) -> Result<ChromiumContext, CaptureError> {
        let (context_id, page) = {
            let mut guard = self.session.lock().await;
            let session = guard.as_mut().ok_or(CaptureError::NotInitialized)?;

            let context_id = session
                .browser
                .create_browser_context(CreateBrowserContextParams::default())
                .await
                .map_err(browser_err)?;

            let params = CreateTargetParams::builder()
                .url("about:blank")
                .browser_context_id(context_id.clone())
                .build()
                .map_err(CaptureError::Browser)?;

            match session.browser.new_page(params).await {
                Ok(page) => (context_id, page),
                Err(e) => {
                    if let Err(dispose) = session.browser.dispose_browser_context(context_id).await {
                        warn!("Failed to dispose browser context: {}", dispose);
                    }
                    return Err(browser_err(e));
                }
            }
        };

        let mut context = ChromiumContext {
            page: Some(page),
            context_id: Some(context_id),
            session: Arc::clone(&self.session),
            interceptor: None,
        };

        if let Err(e) = context.apply_profile(profile).await {
            if let Err(close) = context.close().await {
                warn!("Failed to close half-open browsing context: {}", close);
            }
            return Err(e);
        }

        Ok(context)
    }

    async fn shutdown(&self) -> Result<(), CaptureError> {
        let Some(mut session) = self.session.lock().await.take() else {
            return Ok(());
        };

        let mut result = Ok(());
        if !session.remote {
            if let Err(e) = session.browser.close().await {
                result = Err(browser_err(e));
            }
            if let Err(e) = session.browser.wait().await {
                debug!("Waiting for browser process failed: {}", e);
            }
        }
        session.handler.abort();
        result
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}

/// 一个隔离的 Chromium 浏览上下文
pub struct ChromiumContext {
    page: Option<Page>,
    context_id: Option<BrowserContextId>,
    session: SharedSession,
    interceptor: Option<JoinHandle<()>>,
}

impl ChromiumContext {
    fn page(&self) -> Result<&Page, CaptureError> {
        self.page
            .as_ref()
            .ok_or_else(|| CaptureError::Browser("browsing context already closed".to_string()))
    }

    async fn apply_profile(&mut self, profile: &ContextProfile) -> Result<(), CaptureError> {
        let page = self.page()?.clone();

        for script in &profile.init_scripts {
            page.execute(AddScriptToEvaluateOnNewDocumentParams::new(script.clone()))
                .await
                .map_err(browser_err)?;
        }

        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(profile.user_agent.clone())
            .accept_language(profile.accept_language.clone())
            .build()
            .map_err(CaptureError::Browser)?;
        page.execute(user_agent).await.map_err(browser_err)?;

        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(profile.viewport_width),
            i64::from(profile.viewport_height),
            1.0,
            false,
        ))
        .await
        .map_err(browser_err)?;

        let locale = SetLocaleOverrideParams::builder()
            .locale(profile.locale.clone())
            .build();
        if let Err(e) = page.execute(locale).await {
            debug!("Locale override rejected: {}", e);
        }

        if profile.block_images {
            self.interceptor = Some(block_images(&page).await?);
        }
        Ok(())
    }

    async fn evaluate_string(&self, script: &str) -> Result<String, CaptureError> {
        self.page()?
            .evaluate(script)
            .await
            .map_err(|e| CaptureError::Script(e.to_string()))?
            .into_value::<String>()
            .map_err(|e| CaptureError::Script(e.to_string()))
    }
}

/// 中止图片请求，其余资源放行
async fn block_images(page: &Page) -> Result<JoinHandle<()>, CaptureError> {
    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(browser_err)?;

    let intercept_page = page.clone();
    let handle = tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let result = if event.resource_type == ResourceType::Image {
                intercept_page
                    .execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ())
            } else {
                intercept_page
                    .execute(ContinueRequestParams::new(event.request_id.clone()))
                    .await
                    .map(|_| ())
            };
            if let Err(e) = result {
                trace!("Request interception reply failed: {}", e);
            }
        }
    });

    let pattern = RequestPattern::builder()
        .resource_type(ResourceType::Image)
        .request_stage(RequestStage::Request)
        .build();
    if let Err(e) = page.execute(EnableParams::builder().pattern(pattern).build()).await {
        handle.abort();
        return Err(browser_err(e));
    }
    Ok(handle)
}

#[async_trait]
impl BrowsingContext for ChromiumContext {
    async fn navigate(&mut self, url: &str) -> Result<(), CaptureError> {
        let page = self.page()?;
        page.goto(url).await.map_err(|e| CaptureError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        // goto 返回后再确认文档已可交互
        loop {
            let state = self.evaluate_string(READY_STATE_SCRIPT).await?;
            if state == "interactive" || state == "complete" {
                return Ok(());
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    async fn scroll(&mut self) -> Result<(), CaptureError> {
        let page = self.page()?;
        page.evaluate("window.scrollTo(0, Math.floor(document.body.scrollHeight / 2))")
            .await
            .map_err(|e| CaptureError::Script(e.to_string()))?;
        tokio::time::sleep(SCROLL_PAUSE).await;
        page.evaluate("window.scrollTo(0, 0)")
            .await
            .map_err(|e| CaptureError::Script(e.to_string()))?;
        Ok(())
    }

    async fn title(&mut self) -> Result<String, CaptureError> {
        Ok(self
            .page()?
            .get_title()
            .await
            .map_err(browser_err)?
            .unwrap_or_default())
    }

    async fn body_text(&mut self) -> Result<String, CaptureError> {
        self.evaluate_string(BODY_TEXT_SCRIPT).await
    }

    async fn html(&mut self) -> Result<String, CaptureError> {
        self.page()?.content().await.map_err(browser_err)
    }

    async fn close(&mut self) -> Result<(), CaptureError> {
        if let Some(interceptor) = self.interceptor.take() {
            interceptor.abort();
        }

        let mut result = Ok(());
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                result = Err(browser_err(e));
            }
        }
        if let Some(context_id) = self.context_id.take() {
            if let Some(session) = self.session.lock().await.as_ref() {
                if let Err(e) = session.browser.dispose_browser_context(context_id).await {
                    result = result.and(Err(browser_err(e)));
                }
            }
        }
        result
    }
}

impl Drop for ChromiumContext {
    fn drop(&mut self) {
        if self.page.is_none() && self.context_id.is_none() {
            return;
        }

        // 捕获被取消时在后台回收上下文
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("Browsing context dropped outside runtime; relying on browser shutdown");
            return;
        };
        let mut orphan = ChromiumContext {
            page: self.page.take(),
            context_id: self.context_id.take(),
            session: Arc::clone(&self.session),
            interceptor: self.interceptor.take(),
        };
        runtime.spawn(async move {
            if let Err(e) = orphan.close().await {
                warn!("Background close of browsing context failed: {}", e);
            }
        });
    }
}
