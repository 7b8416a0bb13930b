// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

#[cfg(test)]
mod tests {
    use crate::config::settings::BrowserSettings;
    use crate::engines::capture_controller::CaptureController;
    use crate::engines::traits::{
        BrowserBackend, BrowsingContext, CaptureError, CaptureOptions, ContextProfile, PageCapturer,
    };
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Counters {
        launched: AtomicUsize,
        opened: AtomicUsize,
        closed: AtomicUsize,
        shutdowns: AtomicUsize,
    }

    #[derive(Debug, Clone, Copy)]
    enum Behaviour {
        Normal,
        NavigationError,
        Hang,
        ScriptError,
        Blocked,
    }

    struct FakeBackend {
        counters: Arc<Counters>,
        plan: Mutex<VecDeque<Behaviour>>,
    }

    impl FakeBackend {
        fn new(plan: Vec<Behaviour>) -> (Self, Arc<Counters>) {
            let counters = Arc::new(Counters::default());
            (
                Self {
                    counters: Arc::clone(&counters),
                    plan: Mutex::new(plan.into()),
                },
                counters,
            )
        }
    }

    struct FakeContext {
        counters: Arc<Counters>,
        behaviour: Behaviour,
        user_agent: String,
    }

    #[async_trait]
    impl BrowsingContext for FakeContext {
        async fn navigate(&mut self, url: &str) -> Result<(), CaptureError> {
            match self.behaviour {
                Behaviour::NavigationError => Err(CaptureError::Navigation {
                    url: url.to_string(),
                    message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
                }),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
                _ => Ok(()),
            }
        }

        async fn scroll(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }

        async fn title(&mut self) -> Result<String, CaptureError> {
            Ok(format!("title via {}", self.user_agent.len()))
        }

        async fn body_text(&mut self) -> Result<String, CaptureError> {
            match self.behaviour {
                Behaviour::ScriptError => Err(CaptureError::Script("Execution context was destroyed".into())),
                Behaviour::Blocked => Ok("자동입력 방지를 위해 보안 확인 문자를 입력해 주세요".into()),
                _ => Ok("1위 캠핑의자 랭킹 상승".into()),
            }
        }

        async fn html(&mut self) -> Result<String, CaptureError> {
            Ok("<html><body><div class=\"keywordRank_item__a1b2c\">1위 캠핑의자</div></body></html>".into())
        }

        async fn close(&mut self) -> Result<(), CaptureError> {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait]
    impl BrowserBackend for FakeBackend {
        type Context = FakeContext;

        async fn launch(&self) -> Result<(), CaptureError> {
            self.counters.launched.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn open_context(&self, profile: &ContextProfile) -> Result<FakeContext, CaptureError> {
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            let behaviour = self
                .plan
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Behaviour::Normal);
            Ok(FakeContext {
                counters: Arc::clone(&self.counters),
                behaviour,
                user_agent: profile.user_agent.clone(),
            })
        }

        async fn shutdown(&self) -> Result<(), CaptureError> {
            self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn options() -> CaptureOptions {
        CaptureOptions {
            navigation_timeout: Duration::from_secs(30),
            settle: Duration::from_secs(2),
            simulate_scroll: true,
            block_images: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_success_closes_context_once() {
        let (backend, counters) = FakeBackend::new(vec![Behaviour::Normal]);
        let controller = CaptureController::new(backend, BrowserSettings::default());
        controller.initialize().await.unwrap();

        let page = controller
            .capture_page("https://shop.example.com/best", &options())
            .await
            .unwrap();

        assert!(!page.is_blocked);
        assert_eq!(page.body_length, "1위 캠핑의자 랭킹 상승".chars().count());
        assert_eq!(page.signals.class_candidates, vec!["keywordRank_item".to_string()]);
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_failure_path_closes_context_exactly_once() {
        let plan = vec![
            Behaviour::NavigationError,
            Behaviour::Hang,
            Behaviour::ScriptError,
            Behaviour::Blocked,
            Behaviour::NavigationError,
        ];
        let (backend, counters) = FakeBackend::new(plan.clone());
        let controller = CaptureController::new(backend, BrowserSettings::default());
        controller.initialize().await.unwrap();

        let mut timeouts = 0;
        let mut errors = 0;
        let mut blocked = 0;
        for i in 0..plan.len() {
            match controller
                .capture_page(&format!("https://shop.example.com/{}", i), &options())
                .await
            {
                Ok(page) if page.is_blocked => blocked += 1,
                Ok(_) => panic!("unexpected clean capture"),
                Err(CaptureError::Timeout { .. }) => timeouts += 1,
                Err(_) => errors += 1,
            }
            assert_eq!(
                counters.opened.load(Ordering::SeqCst),
                counters.closed.load(Ordering::SeqCst)
            );
        }

        assert_eq!((timeouts, errors, blocked), (1, 3, 1));
        assert_eq!(counters.closed.load(Ordering::SeqCst), plan.len());
    }

    #[tokio::test]
    async fn test_capture_requires_initialization() {
        let (backend, counters) = FakeBackend::new(vec![]);
        let controller = CaptureController::new(backend, BrowserSettings::default());

        let err = controller
            .capture_page("https://shop.example.com", &options())
            .await
            .unwrap_err();
        assert_eq!(err, CaptureError::NotInitialized);
        assert_eq!(counters.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_initialize_and_close_are_idempotent() {
        let (backend, counters) = FakeBackend::new(vec![]);
        let controller = CaptureController::new(backend, BrowserSettings::default());

        controller.initialize().await.unwrap();
        controller.initialize().await.unwrap();
        assert_eq!(counters.launched.load(Ordering::SeqCst), 1);
        assert!(controller.is_initialized().await);

        controller.close().await.unwrap();
        controller.close().await.unwrap();
        assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 1);

        let err = controller
            .capture_page("https://shop.example.com", &options())
            .await
            .unwrap_err();
        assert_eq!(err, CaptureError::NotInitialized);
    }
}
