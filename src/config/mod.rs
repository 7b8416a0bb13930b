// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理浏览器、抓取节奏、来源模板、存储和指标配置
pub mod settings;
