// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// - 抓取编排（crawl_orchestrator）：串行驱动捕获、提取与持久化
/// - 请求节奏（pacing）：目标之间的随机间隔与失败退避
/// - 批次诊断（batch_analyzer）：结构漂移判断与选择器推荐
pub mod batch_analyzer;
pub mod crawl_orchestrator;
pub mod pacing;
