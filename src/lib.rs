// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含抓取目标、规范化记录、协作者接口与抓取编排
pub mod domain;

/// 引擎模块
///
/// 无头浏览器页面捕获
pub mod engines;

/// 提取模块
///
/// 各来源类别的策略级联
pub mod extractors;

/// 基础设施模块
///
/// 存储、记录写入与指标导出的具体实现
pub mod infrastructure;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;
