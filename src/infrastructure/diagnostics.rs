// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::models::captured_page::{CapturedPage, PageSignals};
use crate::domain::repositories::page_archive::PageArchive;
use crate::domain::repositories::storage_repository::{StorageError, StorageRepository};
use crate::utils::url_utils::{query_params, stable_hash};

const PAGE_FILE: &str = "page.html";
const META_FILE: &str = "meta.json";

/// 归档页面的元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureMeta {
    pub url: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub is_blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    pub body_length: usize,
    /// 页面URL的查询参数
    pub query_params: BTreeMap<String, String>,
    #[serde(default)]
    pub signals: PageSignals,
}

/// 诊断文件写入器
///
/// 按 `{日期}/{HTML哈希}/` 内容寻址保存 `page.html` 与 `meta.json`，
/// 相同内容重复归档落在同一目录
pub struct DiagnosticSink {
    storage: Arc<dyn StorageRepository>,
}

impl DiagnosticSink {
    pub fn new(storage: Arc<dyn StorageRepository>) -> Self {
        Self { storage }
    }

    /// 页面的归档目录键
    pub fn key_for(page: &CapturedPage) -> String {
        format!("{}/{}", page.date_bucket(), stable_hash(&page.raw_html))
    }

    /// 保存页面，返回归档目录键
    pub async fn save(&self, page: &CapturedPage, category: &str) -> Result<String, StorageError> {
        let key = Self::key_for(page);
        let meta = CaptureMeta {
            url: page.url.clone(),
            title: page.title.clone(),
            timestamp: page.captured_at,
            category: category.to_string(),
            is_blocked: page.is_blocked,
            block_reason: page.block_reason.clone(),
            body_length: page.body_length,
            query_params: query_params(&page.url),
            signals: page.signals.clone(),
        };

        self.storage
            .save(&format!("{}/{}", key, PAGE_FILE), page.raw_html.as_bytes())
            .await?;
        self.storage
            .save(&format!("{}/{}", key, META_FILE), &serde_json::to_vec_pretty(&meta)?)
            .await?;

        tracing::debug!("Saved diagnostic capture {} for {}", key, page.url);
        Ok(key)
    }

    /// 读取归档的页面，目录不存在时返回 `None`
    pub async fn load(&self, key: &str) -> Result<Option<(CapturedPage, CaptureMeta)>, StorageError> {
        let Some(meta_bytes) = self.storage.get(&format!("{}/{}", key, META_FILE)).await? else {
            return Ok(None);
        };
        let Some(html_bytes) = self.storage.get(&format!("{}/{}", key, PAGE_FILE)).await? else {
            return Ok(None);
        };

        let meta: CaptureMeta = serde_json::from_slice(&meta_bytes)?;
        let raw_html = String::from_utf8(html_bytes)
            .map_err(|e| StorageError::Other(format!("Archived page is not UTF-8: {}", e)))?;

        let page = CapturedPage {
            url: meta.url.clone(),
            title: meta.title.clone(),
            raw_html,
            captured_at: meta.timestamp,
            is_blocked: meta.is_blocked,
            block_reason: meta.block_reason.clone(),
            body_length: meta.body_length,
            signals: meta.signals.clone(),
        };
        Ok(Some((page, meta)))
    }

    /// 某一天是否已归档过该页面
    pub async fn contains(&self, date: NaiveDate, raw_html: &str) -> Result<bool, StorageError> {
        let key = format!("{}/{}/{}", date, stable_hash(raw_html), PAGE_FILE);
        self.storage.exists(&key).await
    }
}

#[async_trait]
impl PageArchive for DiagnosticSink {
    async fn archive(&self, page: &CapturedPage, category: &str) -> Result<String, StorageError> {
        self.save(page, category).await
    }
}
