// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// - 领域模型（models）：抓取目标、捕获页面、规范化记录与抓取结果
/// - 仓库接口（repositories）：持久化与诊断存储的抽象契约
/// - 服务（services）：抓取编排、请求节奏与批次诊断
///
/// 领域层不依赖任何具体的浏览器或存储实现。
pub mod models;
pub mod repositories;
pub mod services;
