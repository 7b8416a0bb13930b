// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工具模块
///
/// 提取器共享的规范化函数、商品ID派生、重试策略与日志初始化
pub mod retry_policy;
pub mod telemetry;
pub mod text_processing;
pub mod url_utils;
