use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::args::UrlMode;
use crate::config::LoadTestSettings;
use crate::error::AppResult;
use crate::protocol::{OutcomeRecord, ProtocolAdapter, RequestOptions, SessionHandle};

use super::Scenario;
use super::arena::UserArena;

/// One request per call against the exact URL or a random configured path.
pub struct SimpleScenario {
    adapter: Arc<dyn ProtocolAdapter>,
    settings: Arc<LoadTestSettings>,
    sessions: UserArena<SessionHandle>,
}

impl SimpleScenario {
    #[must_use]
    pub fn new(settings: Arc<LoadTestSettings>, adapter: Arc<dyn ProtocolAdapter>) -> Self {
        Self {
            adapter,
            settings,
            sessions: UserArena::default(),
        }
    }

    fn pick_target(&self) -> String {
        if self.settings.url_mode == UrlMode::Exact {
            return self.settings.url.clone();
        }
        self.settings
            .target_urls
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| self.settings.url.clone())
    }
}

#[async_trait]
impl Scenario for SimpleScenario {
    async fn execute(&self, user_id: u64) -> AppResult<OutcomeRecord> {
        let slot = self.sessions.slot(user_id);
        let mut guard = slot.lock().await;
        let mut session = match guard.take() {
            Some(session) => session,
            None => self.adapter.create_session(user_id).await?,
        };

        let url = self.pick_target();
        let record = self
            .adapter
            .request(&mut session, &url, user_id, &RequestOptions::default())
            .await;

        *guard = Some(session);
        Ok(record)
    }

    async fn cleanup(&self) {
        for session in self.sessions.drain() {
            self.adapter.close_session(session).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    use clap::Parser;

    use super::*;
    use crate::args::{Protocol, SurgeArgs};
    use crate::error::{AppError, ProtocolError};

    fn run_async_test<F>(future: F) -> AppResult<()>
    where
        F: Future<Output = AppResult<()>>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
        runtime.block_on(future)
    }

    fn settings(extra: &[&str]) -> AppResult<Arc<LoadTestSettings>> {
        let mut argv = vec!["surge", "http://api.test/start"];
        argv.extend_from_slice(extra);
        let args = SurgeArgs::try_parse_from(argv)?;
        Ok(Arc::new(LoadTestSettings::from_args(&args)?))
    }

    /// Counts session lifecycle calls and remembers every requested URL.
    #[derive(Default)]
    struct CountingAdapter {
        created: Mutex<Vec<u64>>,
        closed: Mutex<Vec<u64>>,
        urls: Mutex<Vec<String>>,
    }

    fn locked<T: Clone>(cell: &Mutex<Vec<T>>) -> Vec<T> {
        cell.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[async_trait]
    impl ProtocolAdapter for CountingAdapter {
        fn protocol(&self) -> Protocol {
            Protocol::Http
        }

        async fn create_session(&self, user_id: u64) -> Result<SessionHandle, ProtocolError> {
            self.created
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(user_id);
            Ok(SessionHandle::new(user_id, Vec::new(), Default::default()))
        }

        async fn request(
            &self,
            _session: &mut SessionHandle,
            url: &str,
            user_id: u64,
            _options: &RequestOptions,
        ) -> OutcomeRecord {
            self.urls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(url.to_owned());
            let mut record = OutcomeRecord::new(user_id, url, "GET");
            record.status = Some(200);
            record.response_time = Duration::from_millis(1);
            record
        }

        async fn close_session(&self, session: SessionHandle) {
            self.closed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(session.user_id);
        }
    }

    #[test]
    fn random_targets_reuse_one_session_per_user() -> AppResult<()> {
        run_async_test(async {
            let settings = settings(&[])?;
            let adapter = Arc::new(CountingAdapter::default());
            let scenario = SimpleScenario::new(
                Arc::clone(&settings),
                Arc::clone(&adapter) as Arc<dyn ProtocolAdapter>,
            );

            for _round in 0..10 {
                for user_id in 1..=3 {
                    let record = scenario.execute(user_id).await?;
                    if record.user_id != user_id {
                        return Err(AppError::validation("Record carries the wrong user"));
                    }
                }
            }
            scenario.cleanup().await;

            let urls = locked(&adapter.urls);
            let mut created = locked(&adapter.created);
            created.sort_unstable();
            let mut closed = locked(&adapter.closed);
            closed.sort_unstable();
            let checks = [
                (urls.len() == 30, "every execute issues one request"),
                (
                    urls.iter().all(|url| settings.target_urls.contains(url)),
                    "urls come from the target list",
                ),
                (!urls.iter().any(|url| url.ends_with("/start")), "base path is not requested"),
                (created == vec![1, 2, 3], "one session per user"),
                (closed == vec![1, 2, 3], "cleanup closes every session"),
            ];
            for (passed, message) in checks {
                if !passed {
                    return Err(AppError::validation(format!("{}: {:?}", message, urls)));
                }
            }

            scenario.cleanup().await;
            if locked(&adapter.closed).len() != 3 {
                return Err(AppError::validation("Sessions must be closed only once"));
            }
            Ok(())
        })
    }

    #[test]
    fn exact_mode_always_hits_the_configured_url() -> AppResult<()> {
        run_async_test(async {
            let settings = settings(&["--url-mode", "exact"])?;
            let adapter = Arc::new(CountingAdapter::default());
            let scenario = SimpleScenario::new(
                Arc::clone(&settings),
                Arc::clone(&adapter) as Arc<dyn ProtocolAdapter>,
            );
            for _round in 0..5 {
                scenario.execute(7).await?;
            }
            let urls = locked(&adapter.urls);
            if urls.len() != 5 || urls.iter().any(|url| *url != settings.url) {
                return Err(AppError::validation(format!("Unexpected targets: {:?}", urls)));
            }
            Ok(())
        })
    }
}
