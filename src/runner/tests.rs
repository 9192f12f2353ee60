use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;

use super::*;
use crate::args::SurgeArgs;
use crate::error::{AppError, AppResult, ReportError, ScenarioError};
use crate::metrics::ProgressSnapshot;
use crate::protocol::OutcomeRecord;

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
    let mut argv = vec![
        "surge",
        "http://load.test",
        "--ramp-up",
        "0",
        "--think-min",
        "0",
        "--think-max",
        "0",
    ];
    argv.extend_from_slice(extra);
    let args = SurgeArgs::try_parse_from(argv)?;
    Ok(Arc::new(LoadTestSettings::from_args(&args)?))
}

/// Answers every call with a 200 after a short pause.
#[derive(Default)]
struct CountingScenario {
    calls: AtomicU64,
    cleanups: AtomicU64,
    fail_sessions: bool,
}

#[async_trait]
impl Scenario for CountingScenario {
    async fn execute(&self, user_id: u64) -> AppResult<OutcomeRecord> {
        if self.fail_sessions {
            return Err(AppError::scenario("session refused"));
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
        self.calls.fetch_add(1, Ordering::Relaxed);
        let mut record = OutcomeRecord::new(user_id, "http://load.test", "GET");
        record.status = Some(200);
        record.response_time = Duration::from_millis(1);
        Ok(record)
    }

    async fn cleanup(&self) {
        self.cleanups.fetch_add(1, Ordering::Relaxed);
    }
}

/// Records which callbacks ran, in order.
struct RecordingReporter {
    events: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Reporter for RecordingReporter {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn report_start(&mut self, _settings: &LoadTestSettings) -> Result<(), ReportError> {
        self.push("start".to_owned());
        Ok(())
    }

    async fn report_progress(&mut self, _snapshot: &ProgressSnapshot) -> Result<(), ReportError> {
        self.push("progress".to_owned());
        Ok(())
    }

    async fn report(&mut self, results: &FinalResults) -> Result<(), ReportError> {
        self.push(format!("report:{}", results.total_requests));
        Ok(())
    }
}

impl RecordingReporter {
    fn push(&self, event: String) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

fn components(
    settings: Arc<LoadTestSettings>,
    scenario: Arc<CountingScenario>,
    events: &Arc<Mutex<Vec<String>>>,
) -> (RunComponents, Arc<MetricsAggregator>, ShutdownToken) {
    let metrics = Arc::new(MetricsAggregator::new());
    let shutdown = ShutdownToken::new();
    let components = RunComponents {
        settings,
        scenario,
        reporters: vec![Box::new(RecordingReporter {
            events: Arc::clone(events),
        })],
        metrics: Arc::clone(&metrics),
        shutdown: shutdown.clone(),
    };
    (components, metrics, shutdown)
}

#[test]
fn fixed_mode_issues_every_planned_request() -> AppResult<()> {
    run_async_test(async {
        let settings = settings(&["--users", "10", "--mode", "fixed", "--requests", "5"])?;
        let scenario = Arc::new(CountingScenario::default());
        let events = Arc::new(Mutex::new(Vec::new()));
        let (components, metrics, _) = components(settings, Arc::clone(&scenario), &events);

        let results = run(components).await;

        let events = events.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let checks = [
            (results.total_requests == 50, "total"),
            (results.successful_requests == 50, "successful"),
            (results.failed_requests == 0, "failed"),
            (results.requests_per_second > 0.0, "rps"),
            (scenario.calls.load(Ordering::Relaxed) == 50, "scenario calls"),
            (scenario.cleanups.load(Ordering::Relaxed) == 1, "cleanup once"),
            (metrics.active_users() == 0, "active users back to zero"),
            (events.first().map(String::as_str) == Some("start"), "start first"),
            (events.last().map(String::as_str) == Some("report:50"), "report last"),
        ];
        for (passed, message) in checks {
            if !passed {
                return Err(AppError::validation(format!(
                    "{}: {:?} events {:?}",
                    message, results, events
                )));
            }
        }
        Ok(())
    })
}

#[test]
fn loop_mode_stops_on_shutdown() -> AppResult<()> {
    run_async_test(async {
        let settings = settings(&["--users", "3", "--duration", "60"])?;
        let scenario = Arc::new(CountingScenario::default());
        let events = Arc::new(Mutex::new(Vec::new()));
        let (components, metrics, shutdown) = components(settings, scenario, &events);

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.trigger();
        });

        let results = tokio::time::timeout(Duration::from_secs(5), run(components))
            .await
            .map_err(|err| AppError::validation(format!("Run ignored shutdown: {}", err)))?;

        if results.total_requests == 0 {
            return Err(AppError::validation("Loop mode recorded nothing"));
        }
        if results.total_requests != results.successful_requests.saturating_add(results.failed_requests) {
            return Err(AppError::validation("Totals do not add up"));
        }
        if metrics.active_users() != 0 {
            return Err(AppError::validation(format!(
                "Active users left at {}",
                metrics.active_users()
            )));
        }
        Ok(())
    })
}

#[test]
fn loop_mode_ends_at_duration() -> AppResult<()> {
    run_async_test(async {
        let settings = settings(&["--users", "2", "--duration", "1"])?;
        let scenario = Arc::new(CountingScenario::default());
        let events = Arc::new(Mutex::new(Vec::new()));
        let (components, _, shutdown) = components(settings, scenario, &events);

        let results = tokio::time::timeout(Duration::from_secs(5), run(components))
            .await
            .map_err(|err| AppError::validation(format!("Run overran: {}", err)))?;

        if !shutdown.is_triggered() {
            return Err(AppError::validation("Natural completion should clear the run flag"));
        }
        if results.duration < Duration::from_millis(900) || results.total_requests == 0 {
            return Err(AppError::validation(format!("Unexpected run: {:?}", results)));
        }
        Ok(())
    })
}

#[test]
fn failing_users_do_not_abort_the_run() -> AppResult<()> {
    run_async_test(async {
        let settings = settings(&["--users", "4", "--mode", "fixed", "--requests", "3"])?;
        let scenario = Arc::new(CountingScenario {
            fail_sessions: true,
            ..CountingScenario::default()
        });
        let events = Arc::new(Mutex::new(Vec::new()));
        let (components, metrics, _) = components(settings, Arc::clone(&scenario), &events);

        let results = run(components).await;
        let events = events.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if results.total_requests != 0 || metrics.active_users() != 0 {
            return Err(AppError::validation(format!("Unexpected results: {:?}", results)));
        }
        if events.last().map(String::as_str) != Some("report:0") {
            return Err(AppError::scenario(ScenarioError::TestExpectation {
                message: "Reporters must still receive final results",
            }));
        }
        Ok(())
    })
}
