// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 领域层协作者接口的具体实现：
/// - 诊断归档（diagnostics）：捕获页面的内容寻址归档
/// - 指标（metrics）：Prometheus 导出器
/// - 记录存储（record_store）：内存中的更新插入记录存储
/// - 存储（storage）：本地文件、S3 与内存二进制存储
pub mod diagnostics;
pub mod metrics;
pub mod record_store;
pub mod storage;
