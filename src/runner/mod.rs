//! Session orchestrator: ramps up virtual users, runs them to completion or
//! shutdown, keeps the progress and metrics ticks going, and hands the final
//! results to every reporter.
mod pacing;
mod progress;
mod user;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::config::LoadTestSettings;
use crate::metrics::{FinalResults, MetricsAggregator};
use crate::reporters::Reporter;
use crate::scenario::Scenario;
use crate::shutdown::ShutdownToken;

pub use pacing::{ramp_delay, rate_limit_delay};
pub use progress::{Completion, completion, snapshot};

use user::{UserContext, run_user};

/// Interval of both the progress and the metrics tick.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

type SharedReporters = Arc<Mutex<Vec<Box<dyn Reporter>>>>;

/// Collaborators for one test run.
pub struct RunComponents {
    pub settings: Arc<LoadTestSettings>,
    pub scenario: Arc<dyn Scenario>,
    pub reporters: Vec<Box<dyn Reporter>>,
    pub metrics: Arc<MetricsAggregator>,
    pub shutdown: ShutdownToken,
}

/// Drives the whole test and returns the final results.
///
/// One user's failure never aborts the others. Auxiliary tasks are stopped
/// and awaited before sessions are closed and results are assembled.
pub async fn run(components: RunComponents) -> FinalResults {
    let RunComponents {
        settings,
        scenario,
        reporters,
        metrics,
        shutdown,
    } = components;
    let reporters: SharedReporters = Arc::new(Mutex::new(reporters));

    {
        let mut reporters = reporters.lock().await;
        for reporter in reporters.iter_mut() {
            if let Err(err) = reporter.report_start(&settings).await {
                error!("Reporter '{}' failed to start: {}", reporter.name(), err);
            }
        }
    }

    let started = Instant::now();
    let progress_task = spawn_progress_task(&settings, &metrics, &shutdown, &reporters);
    let metrics_task = spawn_metrics_task(&metrics, &shutdown);

    let context = Arc::new(UserContext {
        settings: Arc::clone(&settings),
        scenario: Arc::clone(&scenario),
        metrics: Arc::clone(&metrics),
        shutdown: shutdown.clone(),
        started,
    });
    let users = u64::try_from(settings.num_users).unwrap_or(u64::MAX);
    info!(
        "Starting {} virtual users over {:?}",
        settings.num_users, settings.ramp_up
    );
    let handles: Vec<JoinHandle<()>> = (1..=users)
        .map(|user_id| tokio::spawn(run_user(Arc::clone(&context), user_id)))
        .collect();
    for (index, joined) in join_all(handles).await.into_iter().enumerate() {
        if let Err(err) = joined {
            error!("User task {} ended abnormally: {}", index.saturating_add(1), err);
        }
    }

    if shutdown.is_triggered() {
        info!("Test interrupted, collecting partial results");
    }
    shutdown.trigger();
    stop_task(progress_task, "progress").await;
    stop_task(metrics_task, "metrics").await;

    scenario.cleanup().await;
    metrics.periodic_update();
    let results = metrics.final_results();

    let mut reporters = reporters.lock().await;
    for reporter in reporters.iter_mut() {
        if let Err(err) = reporter.report(&results).await {
            error!("Reporter '{}' failed: {}", reporter.name(), err);
        }
    }
    results
}

fn spawn_progress_task(
    settings: &Arc<LoadTestSettings>,
    metrics: &Arc<MetricsAggregator>,
    shutdown: &ShutdownToken,
    reporters: &SharedReporters,
) -> JoinHandle<()> {
    let settings = Arc::clone(settings);
    let metrics = Arc::clone(metrics);
    let shutdown = shutdown.clone();
    let reporters = Arc::clone(reporters);
    tokio::spawn(async move {
        while shutdown.sleep(TICK_INTERVAL).await {
            let current = snapshot(&settings, &metrics);
            let mut reporters = reporters.lock().await;
            for reporter in reporters.iter_mut() {
                if let Err(err) = reporter.report_progress(&current).await {
                    error!("Reporter '{}' progress failed: {}", reporter.name(), err);
                }
            }
        }
    })
}

fn spawn_metrics_task(metrics: &Arc<MetricsAggregator>, shutdown: &ShutdownToken) -> JoinHandle<()> {
    let metrics = Arc::clone(metrics);
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        while shutdown.sleep(TICK_INTERVAL).await {
            metrics.periodic_update();
        }
    })
}

async fn stop_task(handle: JoinHandle<()>, name: &str) {
    handle.abort();
    match handle.await {
        Ok(()) => {}
        Err(err) if err.is_cancelled() => debug!("{} task cancelled", name),
        Err(err) => error!("{} task failed: {}", name, err),
    }
}
