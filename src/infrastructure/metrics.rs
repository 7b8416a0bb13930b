// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 初始化指标系统
///
/// 安装 Prometheus 导出器并注册抓取流水线的指标描述
///
/// # 参数
///
/// * `listen_addr` - 导出器监听地址，如 `0.0.0.0:9000`
pub fn init_metrics(listen_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = listen_addr.parse()?;

    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}. This might happen if the port is already in use.", e);
        return Ok(());
    }

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "capture_pages_total",
        "Total number of page captures by outcome (ok, blocked, error)"
    );
    describe_counter!(
        "capture_contexts_closed_total",
        "Total number of browsing contexts closed after a capture"
    );
    describe_histogram!(
        "capture_duration_seconds",
        Unit::Seconds,
        "Time spent capturing a single page"
    );
    describe_counter!(
        "extraction_records_total",
        "Records produced by the winning extraction strategy, by family and strategy"
    );
    describe_counter!(
        "crawl_targets_total",
        "Total number of crawl targets processed by outcome"
    );
    describe_histogram!(
        "crawl_duration_seconds",
        Unit::Seconds,
        "End-to-end processing time of a crawl target"
    );
}
