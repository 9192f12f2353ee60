use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, error};

use crate::args::TestMode;
use crate::config::LoadTestSettings;
use crate::error::AppResult;
use crate::metrics::MetricsAggregator;
use crate::scenario::Scenario;
use crate::shutdown::ShutdownToken;

use super::pacing::{clip_to_deadline, ramp_delay, rate_limit_delay};

/// Everything a virtual user task needs, shared by all of them.
pub(super) struct UserContext {
    pub(super) settings: Arc<LoadTestSettings>,
    pub(super) scenario: Arc<dyn Scenario>,
    pub(super) metrics: Arc<MetricsAggregator>,
    pub(super) shutdown: ShutdownToken,
    pub(super) started: Instant,
}

/// Keeps the active-user gauge raised for as long as it lives.
struct ActiveUserGuard<'metrics> {
    metrics: &'metrics MetricsAggregator,
}

impl<'metrics> ActiveUserGuard<'metrics> {
    fn enter(metrics: &'metrics MetricsAggregator) -> Self {
        metrics.increment_active_users();
        Self { metrics }
    }
}

impl Drop for ActiveUserGuard<'_> {
    fn drop(&mut self) {
        self.metrics.decrement_active_users();
    }
}

/// Runs one virtual user to completion. Failures end this user only.
pub(super) async fn run_user(context: Arc<UserContext>, user_id: u64) {
    let settings = &context.settings;
    let delay = ramp_delay(settings.ramp_up, user_id, settings.num_users);
    if !context.shutdown.sleep(delay).await {
        debug!("User {} cancelled during ramp-up", user_id);
        return;
    }

    let guard = ActiveUserGuard::enter(&context.metrics);
    let result = match settings.mode {
        TestMode::Loop => run_loop(&context, user_id).await,
        TestMode::Fixed => run_fixed(&context, user_id).await,
    };
    drop(guard);

    if let Err(err) = result {
        error!("User {} stopped early: {}", user_id, err);
    }
}

async fn run_loop(context: &UserContext, user_id: u64) -> AppResult<()> {
    let deadline = context.started.checked_add(context.settings.duration);
    let before_deadline = || deadline.is_none_or(|deadline| Instant::now() < deadline);
    while before_deadline() && !context.shutdown.is_triggered() {
        iterate(context, user_id).await?;

        let pause = context.settings.think_time.sample(&mut rand::thread_rng());
        let pause = deadline.map_or(pause, |deadline| {
            clip_to_deadline(pause, deadline.saturating_duration_since(Instant::now()))
        });
        if !context.shutdown.sleep(pause).await {
            break;
        }
    }
    Ok(())
}

async fn run_fixed(context: &UserContext, user_id: u64) -> AppResult<()> {
    let total = context.settings.requests_per_user;
    for iteration in 0..total {
        if context.shutdown.is_triggered() {
            break;
        }
        iterate(context, user_id).await?;

        if iteration.saturating_add(1) < total {
            let pause = context.settings.think_time.sample(&mut rand::thread_rng());
            if !context.shutdown.sleep(pause).await {
                break;
            }
        }
    }
    Ok(())
}

/// One request: execute, record, then apply the rate-limit damper.
async fn iterate(context: &UserContext, user_id: u64) -> AppResult<()> {
    let record = context.scenario.execute(user_id).await?;
    context.metrics.record(&record);

    if let Some(delay) = rate_limit_delay(context.metrics.current_rps(), context.settings.rate_limit)
    {
        debug!("User {} throttled for {:?}", user_id, delay);
        context.shutdown.sleep(delay).await;
    }
    Ok(())
}
