//! Multi-step workflow engine: a per-user cursor over templated steps, with
//! variable extraction, informational condition checks and branching.
mod conditions;
mod expr;
mod extract;
mod step;
mod template;


use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::LoadTestSettings;
use crate::error::{AppResult, ScenarioError};
use crate::protocol::{OutcomeRecord, ProtocolAdapter, RequestOptions, SessionHandle};

use super::Scenario;
use super::arena::UserArena;

pub use expr::evaluate;
pub use step::{
    ConditionCheck, ConditionKind, ExtractKind, ExtractRule, ExtractSpec, NextStep, OrderedMap,
    RegexGroup, WorkflowStep,
};
pub use template::{Bindings, render};

use extract::Extractor;

struct CompiledStep {
    definition: WorkflowStep,
    extractors: Vec<(String, Extractor)>,
    needs_body: bool,
}

impl CompiledStep {
    fn new(index: usize, definition: WorkflowStep) -> Self {
        let extractors = extract::compile_rules(index, &definition.extract);
        let needs_body = extractors
            .iter()
            .any(|(_, extractor)| extractor.needs_body())
            || definition
                .conditions
                .iter()
                .any(|condition| condition.kind == ConditionKind::Content);
        Self {
            definition,
            extractors,
            needs_body,
        }
    }
}

/// State owned by one virtual user.
struct UserState {
    session: SessionHandle,
    cursor: usize,
    bindings: Bindings,
    last_outcome: Option<OutcomeRecord>,
}

/// Read-only view of one user's workflow progress.
#[derive(Debug, Clone)]
pub struct UserSnapshot {
    pub cursor: usize,
    pub bindings: Bindings,
    pub last_outcome: Option<OutcomeRecord>,
}

pub struct WorkflowScenario {
    adapter: Arc<dyn ProtocolAdapter>,
    settings: Arc<LoadTestSettings>,
    steps: Vec<CompiledStep>,
    users: UserArena<UserState>,
}

impl WorkflowScenario {
    /// Compiles the configured steps.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::EmptyWorkflow`] when no steps are configured.
    pub fn new(
        settings: Arc<LoadTestSettings>,
        adapter: Arc<dyn ProtocolAdapter>,
    ) -> Result<Self, ScenarioError> {
        let steps = settings.workflow_steps.clone();
        Self::with_steps(settings, adapter, steps)
    }

    /// Builds a workflow from explicit steps.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::EmptyWorkflow`] when `steps` is empty.
    pub fn with_steps(
        settings: Arc<LoadTestSettings>,
        adapter: Arc<dyn ProtocolAdapter>,
        steps: Vec<WorkflowStep>,
    ) -> Result<Self, ScenarioError> {
        if steps.is_empty() {
            return Err(ScenarioError::EmptyWorkflow);
        }
        let steps = steps
            .into_iter()
            .enumerate()
            .map(|(index, step)| CompiledStep::new(index, step))
            .collect();
        Ok(Self {
            adapter,
            settings,
            steps,
            users: UserArena::default(),
        })
    }

    /// Current cursor, bindings and last outcome for `user_id`, if the user
    /// has executed at least one step.
    pub async fn user_snapshot(&self, user_id: u64) -> Option<UserSnapshot> {
        let slot = self.users.slot(user_id);
        let guard = slot.lock().await;
        guard.as_ref().map(|state| UserSnapshot {
            cursor: state.cursor,
            bindings: state.bindings.clone(),
            last_outcome: state.last_outcome.clone(),
        })
    }

    fn request_for(&self, step: &CompiledStep, bindings: &Bindings) -> (String, RequestOptions) {
        let definition = &step.definition;
        let url = render(
            definition.url.as_deref().unwrap_or(&self.settings.url),
            bindings,
        );
        let payload = definition.payload.as_ref().map(|payload| match payload {
            Value::String(text) => render(text, bindings),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
                render(&payload.to_string(), bindings)
            }
        });
        let options = RequestOptions {
            method: definition.method,
            headers: definition
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), render(value, bindings)))
                .collect(),
            cookies: definition
                .cookies
                .iter()
                .map(|(name, value)| (name.clone(), render(value, bindings)))
                .collect(),
            content_type: payload
                .as_ref()
                .and(definition.content_type.clone()),
            payload,
            capture_body: step.needs_body,
            max_messages: None,
        };
        (url, options)
    }

    fn run_conditions(&self, cursor: usize, record: &OutcomeRecord, bindings: &Bindings) {
        let Some(step) = self.steps.get(cursor) else {
            return;
        };
        for (index, condition) in step.definition.conditions.iter().enumerate() {
            match conditions::check(condition, record, bindings) {
                Ok(true) => {}
                Ok(false) => info!(
                    "User {} step {} condition {} ({:?}) failed",
                    record.user_id, cursor, index, condition.kind
                ),
                Err(err) => debug!(
                    "User {} step {} condition {} not evaluated: {}",
                    record.user_id, cursor, index, err
                ),
            }
        }
    }

    fn next_cursor(&self, cursor: usize, bindings: &Bindings) -> usize {
        let len = self.steps.len();
        let default_next = i64::try_from(cursor).unwrap_or(0).saturating_add(1);
        let target = match self
            .steps
            .get(cursor)
            .and_then(|step| step.definition.next_step.as_ref())
        {
            Some(NextStep::Index(index)) => *index,
            Some(NextStep::Branches(branches)) => branches
                .iter()
                .find(|(expression, _)| evaluate(expression, bindings))
                .map_or(default_next, |(_, target)| *target),
            None => default_next,
        };
        let len_i64 = i64::try_from(len).unwrap_or(i64::MAX).max(1);
        usize::try_from(target.rem_euclid(len_i64)).unwrap_or(0)
    }
}

#[async_trait]
impl Scenario for WorkflowScenario {
    async fn execute(&self, user_id: u64) -> AppResult<OutcomeRecord> {
        let slot = self.users.slot(user_id);
        let mut guard = slot.lock().await;
        let mut state = match guard.take() {
            Some(state) => state,
            None => UserState {
                session: self.adapter.create_session(user_id).await?,
                cursor: 0,
                bindings: Bindings::new(),
                last_outcome: None,
            },
        };

        if state.cursor >= self.steps.len() {
            state.cursor = 0;
        }
        let cursor = state.cursor;
        let Some(step) = self.steps.get(cursor) else {
            return Err(ScenarioError::EmptyWorkflow.into());
        };

        let (url, options) = self.request_for(step, &state.bindings);
        let record = self
            .adapter
            .request(&mut state.session, &url, user_id, &options)
            .await;

        if !record.is_error() && !step.extractors.is_empty() {
            extract::apply(&step.extractors, &record, &mut state.bindings);
        }
        self.run_conditions(cursor, &record, &state.bindings);

        state.cursor = self.next_cursor(cursor, &state.bindings);
        state.last_outcome = Some(record.clone());
        *guard = Some(state);
        Ok(record)
    }

    async fn cleanup(&self) {
        for state in self.users.drain() {
            self.adapter.close_session(state.session).await;
        }
    }
}
