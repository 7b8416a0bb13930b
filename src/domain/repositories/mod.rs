// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 外部协作者的抽象契约，具体实现位于基础设施层：
/// - 记录写入（record_sink）：按自然键更新插入规范化记录
/// - 存储仓库（storage_repository）：诊断页面的二进制存储
/// - 页面归档（page_archive）：按内容寻址保存捕获页面
pub mod page_archive;
pub mod record_sink;
pub mod storage_repository;
