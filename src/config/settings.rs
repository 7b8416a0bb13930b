// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::target::SourceFamily;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 远程浏览器调试地址的环境变量
pub const REMOTE_DEBUGGING_ENV: &str = "CHROMIUM_REMOTE_DEBUGGING_URL";

/// 应用程序配置设置
///
/// 包含浏览器、抓取节奏、来源URL模板、诊断存储和指标导出配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 浏览器配置
    pub browser: BrowserSettings,
    /// 抓取配置
    pub crawl: CrawlSettings,
    /// 来源URL模板
    pub sources: SourceSettings,
    /// 诊断存储配置
    pub storage: StorageSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 浏览器配置设置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// 是否无头模式
    pub headless: bool,
    /// Chrome 可执行文件路径，未设置时自动探测
    pub executable_path: Option<String>,
    /// 远程调试地址，设置后连接已有浏览器而不是启动新进程
    pub remote_debugging_url: Option<String>,
    /// 导航超时时间（秒）
    pub navigation_timeout_secs: u64,
    /// 页面加载后的稳定等待时间（毫秒）
    pub settle_ms: u64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// 浏览器语言
    pub locale: String,
    /// Accept-Language 请求头
    pub accept_language: String,
    /// 是否拦截图片请求
    pub block_images: bool,
    /// 是否模拟滚动
    pub simulate_scroll: bool,
    /// 自定义 User-Agent 池，为空时使用内置池
    pub user_agents: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable_path: None,
            remote_debugging_url: None,
            navigation_timeout_secs: 30,
            settle_ms: 2000,
            viewport_width: 1920,
            viewport_height: 1080,
            locale: "ko-KR".to_string(),
            accept_language: "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
            block_images: true,
            simulate_scroll: true,
            user_agents: Vec::new(),
        }
    }
}

impl BrowserSettings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// 远程调试地址，配置优先，其次读取环境变量
    pub fn remote_url(&self) -> Option<String> {
        self.remote_debugging_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| std::env::var(REMOTE_DEBUGGING_ENV).ok())
    }
}

/// 抓取配置设置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    /// 写入记录时使用的归属身份
    pub owner_id: String,
    /// 目标之间的基础间隔（毫秒）
    pub pacing_ms: u64,
    /// 间隔的随机抖动上限（毫秒）
    pub pacing_jitter_ms: u64,
    /// 被拦截页面的最大重试次数
    pub max_block_retries: u32,
    /// 是否保存诊断页面
    pub persist_diagnostics: bool,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            owner_id: "default".to_string(),
            pacing_ms: 3000,
            pacing_jitter_ms: 2000,
            max_block_retries: 1,
            persist_diagnostics: false,
        }
    }
}

/// 各来源类别的URL模板，`{keyword}` 会被替换为URL编码后的关键词
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub listing_url_template: String,
    pub keyword_ranking_url_template: String,
    pub category_best_url_template: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            listing_url_template: "https://search.shopping.naver.com/search/all?query={keyword}"
                .to_string(),
            keyword_ranking_url_template:
                "https://search.shopping.naver.com/best/category/keyword?categoryCategoryId={keyword}"
                    .to_string(),
            category_best_url_template:
                "https://search.shopping.naver.com/best/category/click?categoryCategoryId={keyword}"
                    .to_string(),
        }
    }
}

impl SourceSettings {
    pub fn template_for(&self, family: SourceFamily) -> &str {
        match family {
            SourceFamily::Listing => &self.listing_url_template,
            SourceFamily::KeywordRanking => &self.keyword_ranking_url_template,
            SourceFamily::CategoryBest => &self.category_best_url_template,
        }
    }
}

/// 存储配置设置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// 存储类型 (local, s3)
    pub storage_type: String,
    /// 本地存储路径 (当 type=local 时使用)
    pub local_path: Option<String>,
    /// S3 区域
    pub s3_region: Option<String>,
    /// S3 存储桶名称
    pub s3_bucket: Option<String>,
    /// S3 访问密钥
    pub s3_access_key: Option<String>,
    /// S3 密钥
    pub s3_secret_key: Option<String>,
    /// S3 端点 (可选，用于 MinIO 等兼容服务)
    pub s3_endpoint: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            storage_type: "local".to_string(),
            local_path: Some("./storage/diagnostics".to_string()),
            s3_region: None,
            s3_bucket: None,
            s3_access_key: None,
            s3_secret_key: None,
            s3_endpoint: None,
        }
    }
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,
    /// Prometheus 导出器监听地址
    pub listen_addr: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "0.0.0.0:9000".to_string(),
        }
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加内置默认值、`config/default.toml`、`config/{APP_ENVIRONMENT}.toml`
    /// 和 `SHOPCRAWL__` 前缀的环境变量
    ///
    /// # 返回值
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::load(Path::new("config"), &env)
    }

    /// 从指定目录加载配置
    pub fn load(config_dir: &Path, env: &str) -> Result<Self, ConfigError> {
        let default_file = config_dir.join("default");
        let env_file = config_dir.join(env);

        let builder = Config::builder()
            .add_source(File::with_name(&default_file.to_string_lossy()).required(false))
            .add_source(File::with_name(&env_file.to_string_lossy()).required(false))
            .add_source(
                Environment::with_prefix("SHOPCRAWL")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("browser.user_agents")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}
