use thiserror::Error;

/// Errors surfaced by the execution core.
///
/// Planning failures never leave the plan generator (the heuristic fallback
/// absorbs them); execution and validation failures land in
/// [`crate::state::ExecutionState::error`] for the router to adjudicate;
/// only session failures abort a task outright.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Generative planning call or parse failed.
    #[error("planning failed: {0}")]
    Planning(String),

    /// A collaborator call failed while executing a step.
    #[error("execution of {action} failed: {message}")]
    Execution { action: String, message: String },

    /// Both validation tiers rejected a step.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The browser session could not be initialized or torn down.
    #[error("session failure: {0}")]
    Session(String),
}

impl AgentError {
    pub fn planning(message: impl Into<String>) -> Self {
        Self::Planning(message.into())
    }

    pub fn execution(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            action: action.into(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn session(message: impl Into<String>) -> Self {
        Self::Session(message.into())
    }
}
