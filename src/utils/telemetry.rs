// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 设置后输出JSON格式日志
pub const LOG_JSON_ENV: &str = "SHOPCRAWL_LOG_JSON";

const DEFAULT_FILTER: &str = "info,shopcrawl=debug";

/// 初始化日志订阅器
///
/// 过滤规则优先读取 `RUST_LOG`，否则使用默认级别。重复调用时静默忽略。
pub fn init_telemetry() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    let result = if std::env::var_os(LOG_JSON_ENV).is_some() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Telemetry already initialized");
    }
}
