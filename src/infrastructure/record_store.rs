// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;

use crate::domain::models::record::NormalizedRecord;
use crate::domain::repositories::record_sink::{RecordSink, SaveReport, SinkError};

/// 记录的唯一键：归属身份、日期分桶、记录类型与自然键
pub type RecordKey = (String, NaiveDate, &'static str, String);

/// 内存记录存储
///
/// 按自然键更新插入，重复写入同一记录只保留最新版本
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: DashMap<RecordKey, NormalizedRecord>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 某个归属身份在指定日期的全部记录
    pub fn records_for(&self, owner: &str, date: NaiveDate) -> Vec<NormalizedRecord> {
        self.records
            .iter()
            .filter(|entry| entry.key().0 == owner && entry.key().1 == date)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl RecordSink for InMemoryRecordStore {
    async fn save(
        &self,
        owner: &str,
        date: NaiveDate,
        records: Vec<NormalizedRecord>,
    ) -> Result<SaveReport, SinkError> {
        if owner.trim().is_empty() {
            return Err(SinkError::Rejected("owner id is empty".to_string()));
        }

        let mut report = SaveReport::default();
        for record in records {
            let natural_key = record.natural_key();
            if natural_key.trim().is_empty() {
                report
                    .errors
                    .push(format!("{} record without natural key", record.kind()));
                continue;
            }
            self.records
                .insert((owner.to_string(), date, record.kind(), natural_key), record);
            report.saved += 1;
        }

        tracing::debug!(
            "Upserted {} records for {} on {} ({} total)",
            report.saved,
            owner,
            date,
            self.records.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::record::{Product, RankedKeyword};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
    }

    #[tokio::test]
    async fn test_repeated_saves_upsert() {
        let store = InMemoryRecordStore::new();
        let mut product = Product::new("의자", "https://x.example.com/products/1?utm_source=a", "레저");

        store
            .save("owner", day(), vec![product.clone().into()])
            .await
            .unwrap();
        product.price = 15000;
        let report = store.save("owner", day(), vec![product.into()]).await.unwrap();

        assert_eq!(report.saved, 1);
        assert_eq!(store.len(), 1);
        match &store.records_for("owner", day())[0] {
            NormalizedRecord::Product(p) => assert_eq!(p.price, 15000),
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_keys_are_scoped_by_owner_and_date() {
        let store = InMemoryRecordStore::new();
        let record: NormalizedRecord = RankedKeyword::new(1, "텀블러", "주방").into();

        store.save("a", day(), vec![record.clone()]).await.unwrap();
        store.save("b", day(), vec![record.clone()]).await.unwrap();
        store
            .save("a", day().succ_opt().unwrap(), vec![record])
            .await
            .unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.records_for("a", day()).len(), 1);
    }

    #[tokio::test]
    async fn test_empty_owner_is_rejected() {
        let store = InMemoryRecordStore::new();
        let result = store.save(" ", day(), vec![]).await;
        assert!(matches!(result, Err(SinkError::Rejected(_))));
    }
}
