// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::extractors::{ExtractionError, PageDocument};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

/// 单个提取策略
///
/// 返回空列表表示未匹配，级联继续尝试下一个策略
pub trait ExtractionStrategy<T>: Send + Sync {
    fn name(&self) -> &'static str;

    fn try_extract(&self, document: &PageDocument) -> Result<Vec<T>, ExtractionError>;
}

/// 单个策略的尝试记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyAttempt {
    pub name: String,
    pub records: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 级联执行结果
#[derive(Debug)]
pub struct CascadeOutcome<T> {
    pub records: Vec<T>,
    /// 产出记录的策略，全部未命中时为 `None`
    pub strategy: Option<&'static str>,
    pub attempts: Vec<StrategyAttempt>,
}

/// 按优先级排列的策略级联
///
/// 第一个产出至少一条记录的策略短路后续策略
pub struct Cascade<T> {
    label: &'static str,
    strategies: Vec<Box<dyn ExtractionStrategy<T>>>,
}

impl<T> Cascade<T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            strategies: Vec::new(),
        }
    }

    /// 追加一个策略，优先级低于已有策略
    pub fn with(mut self, strategy: impl ExtractionStrategy<T> + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// 依次执行策略直到有结果
    pub fn run(&self, document: &PageDocument) -> CascadeOutcome<T> {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let name = strategy.name();
            let result = catch_unwind(AssertUnwindSafe(|| strategy.try_extract(document)))
                .unwrap_or_else(|_| {
                    Err(ExtractionError::Structure(format!(
                        "strategy {} panicked",
                        name
                    )))
                });

            match result {
                Ok(records) if !records.is_empty() => {
                    debug!("{}: strategy {} produced {} records", self.label, name, records.len());
                    attempts.push(StrategyAttempt {
                        name: name.to_string(),
                        records: records.len(),
                        error: None,
                    });
                    return CascadeOutcome {
                        records,
                        strategy: Some(name),
                        attempts,
                    };
                }
                Ok(_) => {
                    debug!("{}: strategy {} found nothing", self.label, name);
                    attempts.push(StrategyAttempt {
                        name: name.to_string(),
                        records: 0,
                        error: None,
                    });
                }
                Err(e) => {
                    warn!("{}: strategy {} failed: {}", self.label, name, e);
                    attempts.push(StrategyAttempt {
                        name: name.to_string(),
                        records: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        debug!("{}: no strategy matched", self.label);
        CascadeOutcome {
            records: Vec::new(),
            strategy: None,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        output: Result<Vec<u32>, ExtractionError>,
    }

    impl ExtractionStrategy<u32> for Counting {
        fn name(&self) -> &'static str {
            self.name
        }

        fn try_extract(&self, _document: &PageDocument) -> Result<Vec<u32>, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.output.clone()
        }
    }

    struct Panicking;

    impl ExtractionStrategy<u32> for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn try_extract(&self, _document: &PageDocument) -> Result<Vec<u32>, ExtractionError> {
            panic!("unexpected structure")
        }
    }

    fn counting(name: &'static str, output: Result<Vec<u32>, ExtractionError>) -> (Counting, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Counting {
                name,
                calls: Arc::clone(&calls),
                output,
            },
            calls,
        )
    }

    fn document() -> PageDocument {
        PageDocument::parse("<html><body></body></html>", "https://shop.example.com", "")
    }

    #[test]
    fn test_first_match_short_circuits() {
        let (first, first_calls) = counting("first", Ok(vec![1, 2]));
        let (second, second_calls) = counting("second", Ok(vec![9]));
        let cascade = Cascade::new("test").with(first).with(second);

        let outcome = cascade.run(&document());
        assert_eq!(outcome.records, vec![1, 2]);
        assert_eq!(outcome.strategy, Some("first"));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_errors_and_panics_fall_through() {
        let (failing, _) = counting("failing", Err(ExtractionError::Payload("bad json".into())));
        let (empty, _) = counting("empty", Ok(vec![]));
        let (last, last_calls) = counting("last", Ok(vec![7]));
        let cascade = Cascade::new("test")
            .with(failing)
            .with(Panicking)
            .with(empty)
            .with(last);

        let outcome = cascade.run(&document());
        assert_eq!(outcome.records, vec![7]);
        assert_eq!(outcome.strategy, Some("last"));
        assert_eq!(last_calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.attempts.len(), 4);
        assert!(outcome.attempts[0].error.as_deref().unwrap().contains("bad json"));
        assert!(outcome.attempts[1].error.is_some());
        assert_eq!(outcome.attempts[2].error, None);
    }

    #[test]
    fn test_no_match_returns_empty() {
        let (only, _) = counting("only", Ok(vec![]));
        let outcome = Cascade::new("test").with(only).run(&document());
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.strategy, None);
    }
}
