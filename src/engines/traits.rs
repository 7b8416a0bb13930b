// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::BrowserSettings;
use crate::domain::models::captured_page::CapturedPage;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// 页面捕获错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// 浏览器尚未初始化或已关闭
    #[error("Browser not initialized")]
    NotInitialized,
    /// 浏览器启动或连接失败
    #[error("Browser launch failed: {0}")]
    Launch(String),
    /// 导航失败
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    /// 超时
    #[error("Timed out after {timeout:?} while loading {url}")]
    Timeout { url: String, timeout: Duration },
    /// 浏览器协议错误
    #[error("Browser error: {0}")]
    Browser(String),
    /// 页面脚本执行失败
    #[error("Script evaluation failed: {0}")]
    Script(String),
}

impl CaptureError {
    /// 判断错误是否可重试
    ///
    /// # 返回值
    ///
    /// 超时与导航错误返回true，其余返回false
    pub fn is_retryable(&self) -> bool {
        matches!(self, CaptureError::Timeout { .. } | CaptureError::Navigation { .. })
    }
}

/// 单个浏览上下文的伪装配置
#[derive(Debug, Clone, PartialEq)]
pub struct ContextProfile {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub locale: String,
    pub accept_language: String,
    /// 是否中止图片请求
    pub block_images: bool,
    /// 在任何页面脚本运行前注入的脚本
    pub init_scripts: Vec<String>,
}

/// 单次捕获的选项
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOptions {
    /// 导航超时
    pub navigation_timeout: Duration,
    /// 页面就绪后的稳定等待
    pub settle: Duration,
    /// 是否模拟向下再向上的滚动
    pub simulate_scroll: bool,
    pub block_images: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            settle: Duration::from_secs(2),
            simulate_scroll: true,
            block_images: true,
        }
    }
}

impl From<&BrowserSettings> for CaptureOptions {
    fn from(settings: &BrowserSettings) -> Self {
        Self {
            navigation_timeout: settings.navigation_timeout(),
            settle: settings.settle(),
            simulate_scroll: settings.simulate_scroll,
            block_images: settings.block_images,
        }
    }
}

/// 隔离的浏览上下文
///
/// 由后端打开，调用方负责在所有路径上调用一次 `close`
#[async_trait]
pub trait BrowsingContext: Send {
    /// 导航并等待文档进入可交互状态
    async fn navigate(&mut self, url: &str) -> Result<(), CaptureError>;

    /// 向下滚动再回到顶部
    async fn scroll(&mut self) -> Result<(), CaptureError>;

    /// 当前 `document.title`
    async fn title(&mut self) -> Result<String, CaptureError>;

    /// 渲染后的正文文本
    async fn body_text(&mut self) -> Result<String, CaptureError>;

    /// 渲染后的完整HTML
    async fn html(&mut self) -> Result<String, CaptureError>;

    /// 关闭上下文并释放资源
    async fn close(&mut self) -> Result<(), CaptureError>;
}

/// 浏览器后端特质
///
/// 持有唯一的浏览器进程，按需打开隔离的浏览上下文
#[async_trait]
pub trait BrowserBackend: Send + Sync {
    type Context: BrowsingContext + 'static;

    /// 启动或连接浏览器进程
    async fn launch(&self) -> Result<(), CaptureError>;

    /// 以指定配置打开新的浏览上下文
    async fn open_context(&self, profile: &ContextProfile) -> Result<Self::Context, CaptureError>;

    /// 终止浏览器进程
    async fn shutdown(&self) -> Result<(), CaptureError>;

    /// 后端名称
    fn name(&self) -> &'static str;
}

/// 页面捕获器
///
/// 编排器只依赖该特质，测试可以替换为伪实现
#[async_trait]
pub trait PageCapturer: Send + Sync {
    /// 启动共享浏览器，已初始化时为空操作
    async fn initialize(&self) -> Result<(), CaptureError>;

    /// 捕获一个页面
    ///
    /// # 参数
    ///
    /// * `url` - 目标URL
    /// * `options` - 超时、稳定等待与交互选项
    ///
    /// # 返回值
    ///
    /// * `Ok(CapturedPage)` - 捕获结果，被拦截的页面也以此返回
    /// * `Err(CaptureError)` - 导航或浏览器错误
    async fn capture_page(&self, url: &str, options: &CaptureOptions) -> Result<CapturedPage, CaptureError>;

    /// 关闭共享浏览器，可重复调用
    async fn close(&self) -> Result<(), CaptureError>;

    async fn is_initialized(&self) -> bool;
}
