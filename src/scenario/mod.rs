//! Scenario engines: what a virtual user does on each iteration.
mod arena;
pub mod simple;
pub mod workflow;

use std::sync::Arc;

use async_trait::async_trait;

use crate::args::ScenarioKind;
use crate::config::LoadTestSettings;
use crate::error::AppResult;
use crate::protocol::{OutcomeRecord, ProtocolAdapter};

pub use simple::SimpleScenario;
pub use workflow::{WorkflowScenario, WorkflowStep};

#[async_trait]
pub trait Scenario: Send + Sync {
    /// Runs one iteration for `user_id` and returns its outcome.
    ///
    /// # Errors
    ///
    /// Returns an error only when the user's session cannot be created.
    /// Request failures are reported inside the returned record.
    async fn execute(&self, user_id: u64) -> AppResult<OutcomeRecord>;

    /// Releases every per-user session once all users have stopped.
    async fn cleanup(&self);
}

/// Selects the scenario engine for the configured kind.
///
/// # Errors
///
/// Returns an error when a workflow scenario has no steps.
pub fn build_scenario(
    settings: &Arc<LoadTestSettings>,
    adapter: Arc<dyn ProtocolAdapter>,
) -> AppResult<Arc<dyn Scenario>> {
    match settings.scenario {
        ScenarioKind::Simple => Ok(Arc::new(SimpleScenario::new(
            Arc::clone(settings),
            adapter,
        ))),
        ScenarioKind::Workflow => Ok(Arc::new(WorkflowScenario::new(
            Arc::clone(settings),
            adapter,
        )?)),
    }
}
