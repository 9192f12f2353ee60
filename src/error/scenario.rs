use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("No workflow steps defined.")]
    EmptyWorkflow,
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
}
