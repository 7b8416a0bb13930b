// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 反自动化检测配置
//!
//! 启动参数、User-Agent 池以及在页面脚本运行前注入的导航器补丁。

use crate::config::settings::BrowserSettings;
use crate::engines::traits::ContextProfile;

/// 浏览器启动参数：适合服务器环境并去除自动化特征
pub const LAUNCH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-infobars",
    "--disable-notifications",
    "--disable-setuid-sandbox",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-features=TranslateUI",
    "--no-first-run",
    "--no-default-browser-check",
    "--password-store=basic",
    "--hide-scrollbars",
    "--mute-audio",
];

const DESKTOP_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

/// 在任何页面脚本运行前隐藏 `navigator.webdriver` 并补齐插件列表
const NAVIGATOR_PATCH: &str = r#"
(() => {
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });

    const fakePlugins = [
        { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer', description: 'Portable Document Format' },
        { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai', description: '' },
        { name: 'Native Client', filename: 'internal-nacl-plugin', description: '' }
    ];
    const pluginProto = Object.getPrototypeOf(navigator.plugins);
    Object.defineProperty(navigator, 'plugins', {
        get: () => {
            const plugins = {};
            fakePlugins.forEach((plugin, i) => {
                plugins[i] = plugin;
                plugins[plugin.name] = plugin;
            });
            Object.setPrototypeOf(plugins, pluginProto);
            Object.defineProperty(plugins, 'length', { value: fakePlugins.length });
            return plugins;
        }
    });

    if (!window.chrome) {
        window.chrome = { runtime: {} };
    }
})();
"#;

/// User-Agent 池
///
/// 每个浏览上下文随机选择一个，避免单一静态指纹
#[derive(Debug, Clone)]
pub struct UserAgentPool {
    agents: Vec<String>,
}

impl UserAgentPool {
    /// 使用自定义列表创建，列表为空时回退到内置池
    pub fn new(agents: Vec<String>) -> Self {
        let agents: Vec<String> = agents.into_iter().filter(|a| !a.trim().is_empty()).collect();
        if agents.is_empty() {
            return Self::default();
        }
        Self { agents }
    }

    pub fn pick(&self) -> String {
        self.agents[rand::random_range(0..self.agents.len())].clone()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for UserAgentPool {
    fn default() -> Self {
        Self {
            agents: DESKTOP_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// 与 locale 一致的 `navigator.languages` 补丁
fn languages_patch(locale: &str) -> String {
    let primary = locale.split('-').next().unwrap_or(locale);
    let languages = serde_json::json!([locale, primary, "en-US", "en"]);
    format!(
        "Object.defineProperty(navigator, 'languages', {{ get: () => {} }});",
        languages
    )
}

/// 构建单个浏览上下文的伪装配置
pub fn build_profile(settings: &BrowserSettings, pool: &UserAgentPool, block_images: bool) -> ContextProfile {
    ContextProfile {
        user_agent: pool.pick(),
        viewport_width: settings.viewport_width,
        viewport_height: settings.viewport_height,
        locale: settings.locale.clone(),
        accept_language: settings.accept_language.clone(),
        block_images,
        init_scripts: vec![NAVIGATOR_PATCH.to_string(), languages_patch(&settings.locale)],
    }
}
