// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::captured_page::CapturedPage;
use crate::domain::repositories::storage_repository::StorageError;
use async_trait::async_trait;

/// 捕获页面归档
///
/// 保存原始HTML和元数据，供离线调试提取策略；与正确性无关
#[async_trait]
pub trait PageArchive: Send + Sync {
    /// 归档页面，返回归档目录键
    async fn archive(&self, page: &CapturedPage, category: &str) -> Result<String, StorageError>;
}
