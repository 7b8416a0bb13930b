// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// 连续失败后的最长间隔
const MAX_PACING: Duration = Duration::from_secs(60);

/// 目标之间的请求节奏控制
///
/// 间隔从上一个目标处理完成（`record_success`/`record_failure`）起算，
/// 目标本身耗时不计入间隔；连续失败（拦截/超时）后间隔按倍数放大
pub struct Pacer {
    base: Duration,
    jitter: Duration,
    last_completed: Mutex<Option<Instant>>,
    consecutive_failures: Mutex<u32>,
}

impl Pacer {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self {
            base,
            jitter,
            last_completed: Mutex::new(None),
            consecutive_failures: Mutex::new(0),
        }
    }

    /// 本次请求应保持的最小间隔
    pub async fn interval(&self) -> Duration {
        let failures = *self.consecutive_failures.lock().await;
        let jitter = if self.jitter.is_zero() {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::random_range(0..=self.jitter.as_millis() as u64))
        };
        let interval = self.base + jitter;

        if failures == 0 {
            return interval;
        }
        let failure_multiplier = 2u32.saturating_pow(failures.min(6));
        interval.saturating_mul(failure_multiplier).min(MAX_PACING)
    }

    /// 等待到下一次请求的时间点，尚无完成记录时不等待
    pub async fn wait_before_request(&self) {
        let Some(completed) = *self.last_completed.lock().await else {
            return;
        };

        let interval = self.interval().await;
        let elapsed = completed.elapsed();
        if elapsed < interval {
            let delay = interval - elapsed;
            tracing::debug!("Pacing next target in {}ms", delay.as_millis());
            tokio::time::sleep(delay).await;
        }
    }

    /// 记录一次失败完成，间隔从此刻起算
    pub async fn record_failure(&self) {
        *self.consecutive_failures.lock().await += 1;
        self.mark_completed().await;
    }

    /// 记录一次成功完成，清零失败计数
    pub async fn record_success(&self) {
        *self.consecutive_failures.lock().await = 0;
        self.mark_completed().await;
    }

    async fn mark_completed(&self) {
        *self.last_completed.lock().await = Some(Instant::now());
    }

    pub async fn consecutive_failures(&self) -> u32 {
        *self.consecutive_failures.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_does_not_wait() {
        let pacer = Pacer::new(Duration::from_secs(3), Duration::ZERO);
        let start = Instant::now();
        pacer.wait_before_request().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_base_interval_between_requests() {
        let pacer = Pacer::new(Duration::from_secs(3), Duration::ZERO);
        pacer.wait_before_request().await;
        pacer.record_success().await;

        let start = Instant::now();
        pacer.wait_before_request().await;
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(3));
        assert!(waited < Duration::from_millis(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_is_measured_from_completion() {
        let pacer = Pacer::new(Duration::from_secs(3), Duration::ZERO);
        pacer.wait_before_request().await;
        // 目标本身耗时超过间隔
        tokio::time::sleep(Duration::from_secs(5)).await;
        pacer.record_failure().await;

        let completed = Instant::now();
        pacer.wait_before_request().await;
        // 一次失败后间隔翻倍
        assert!(completed.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_after_elapsed_interval_is_immediate() {
        let pacer = Pacer::new(Duration::from_secs(3), Duration::ZERO);
        pacer.record_success().await;
        tokio::time::sleep(Duration::from_secs(4)).await;

        let start = Instant::now();
        pacer.wait_before_request().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_stays_in_range() {
        let pacer = Pacer::new(Duration::from_secs(1), Duration::from_millis(500));
        for _ in 0..20 {
            let interval = pacer.interval().await;
            assert!(interval >= Duration::from_secs(1));
            assert!(interval <= Duration::from_millis(1500));
        }
    }

    #[tokio::test]
    async fn test_failures_widen_interval_up_to_cap() {
        let pacer = Pacer::new(Duration::from_secs(2), Duration::ZERO);
        pacer.record_failure().await;
        assert_eq!(pacer.interval().await, Duration::from_secs(4));

        pacer.record_failure().await;
        assert_eq!(pacer.interval().await, Duration::from_secs(8));

        for _ in 0..10 {
            pacer.record_failure().await;
        }
        assert_eq!(pacer.interval().await, MAX_PACING);

        pacer.record_success().await;
        assert_eq!(pacer.consecutive_failures().await, 0);
        assert_eq!(pacer.interval().await, Duration::from_secs(2));
    }
}
