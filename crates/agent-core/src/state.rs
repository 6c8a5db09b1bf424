//! The single mutable record threaded through the whole control loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use webagent_core_types::{ExecutionId, PageState};

use crate::plan::Plan;
use crate::retrieve::ContextSnippet;

/// Execution state for one task invocation.
///
/// Created once by the orchestrator and mutated in place by the plan
/// generator (`plan`, `current_step`, `steps_completed`), the step executor
/// (`browser_state`, `error`, `screenshots`, `agent_reasoning`), the
/// validator (`steps_completed`, `current_step`, `success`, `error`), and
/// the router (`retries`, `error`, `success`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionState {
    /// Task description, set once at start.
    pub task: String,
    /// Target origin URL, set once at start.
    pub domain: String,
    /// Context snippets from the knowledge retriever, set once before
    /// planning.
    pub retrieved_context: Vec<ContextSnippet>,
    /// Current plan; `None` only before the first planning cycle.
    pub plan: Option<Plan>,
    /// Index of the next step to execute.
    pub current_step: usize,
    /// Indices validated successful, in insertion order.
    pub steps_completed: Vec<usize>,
    /// Last observed page snapshot, written only by the step executor.
    pub browser_state: PageState,
    /// Terminal-success flag; once true, never reset.
    pub success: bool,
    /// Last error message; cleared by the router when it continues despite
    /// an error.
    pub error: Option<String>,
    /// Router-granted continuations after an error.
    pub retries: u32,
    /// Produced artifact paths, append-only.
    pub screenshots: Vec<String>,
    /// Serialized outcome of the last executed step, overwritten each step.
    pub agent_reasoning: String,
    pub execution_id: ExecutionId,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionState {
    pub fn new(task: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            domain: domain.into(),
            retrieved_context: Vec::new(),
            plan: None,
            current_step: 0,
            steps_completed: Vec::new(),
            browser_state: PageState::default(),
            success: false,
            error: None,
            retries: 0,
            screenshots: Vec::new(),
            agent_reasoning: String::new(),
            execution_id: ExecutionId::new(),
            timestamp: Utc::now(),
        }
    }

    /// Number of steps in the current plan, zero before planning.
    pub fn plan_len(&self) -> usize {
        self.plan.as_ref().map(Plan::len).unwrap_or(0)
    }

    /// Serialized snapshot of the current page, lowercased, for heuristic
    /// substring checks.
    pub fn page_content_lower(&self) -> String {
        serde_json::to_string(&self.browser_state)
            .unwrap_or_default()
            .to_lowercase()
    }
}

/// Final result record of one task execution, the externally persisted
/// artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub success: bool,
    pub error: Option<String>,
    pub execution_id: String,
    pub timestamp: String,
    pub steps_completed: Vec<usize>,
    pub screenshots: Vec<String>,
    pub agent_reasoning: String,
}

impl From<&ExecutionState> for ExecutionReport {
    fn from(state: &ExecutionState) -> Self {
        Self {
            success: state.success,
            error: state.error.clone(),
            execution_id: state.execution_id.to_string(),
            timestamp: state.timestamp.to_rfc3339(),
            steps_completed: state.steps_completed.clone(),
            screenshots: state.screenshots.clone(),
            agent_reasoning: state.agent_reasoning.clone(),
        }
    }
}
