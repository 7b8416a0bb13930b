// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::record::NormalizedRecord;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 记录写入错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// 存储拒绝了整批记录
    #[error("Records rejected: {0}")]
    Rejected(String),
    /// 存储不可用
    #[error("Record sink unavailable: {0}")]
    Unavailable(String),
}

/// 一次写入的结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReport {
    /// 成功写入（插入或更新）的记录数
    pub saved: usize,
    /// 单条记录的失败原因
    pub errors: Vec<String>,
}

/// 持久化协作者
///
/// 按自然键更新插入一批记录，重复写入同一记录不会产生重复数据
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// 保存一批记录
    ///
    /// # 参数
    ///
    /// * `owner` - 记录归属的身份标识
    /// * `date` - 逻辑日期分桶
    /// * `records` - 规范化记录，按值移交
    ///
    /// # 返回值
    ///
    /// * `Ok(SaveReport)` - 写入条数与单条失败原因
    /// * `Err(SinkError)` - 整批写入失败
    async fn save(
        &self,
        owner: &str,
        date: NaiveDate,
        records: Vec<NormalizedRecord>,
    ) -> Result<SaveReport, SinkError>;
}
