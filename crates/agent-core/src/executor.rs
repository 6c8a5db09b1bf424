//! Step executor: maps one step to exactly one browser collaborator call.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};
use webagent_core_types::PageState;

use crate::browser::{BrowserDriver, BrowserError};
use crate::errors::AgentError;
use crate::plan::{Step, StepAction, StepData, DEFAULT_WAIT_TIMEOUT_MS};
use crate::state::ExecutionState;

/// Serialized outcome of one dispatched action, kept for observability in
/// `agent_reasoning`.
#[derive(Debug, Clone, Default, Serialize)]
struct ActionRecord {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_state: Option<PageState>,
}

impl ActionRecord {
    fn ok(message: impl Into<String>, page_state: PageState) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            page_state: Some(page_state),
            ..Self::default()
        }
    }
}

/// Executes the step at `current_step` against the browser collaborator.
///
/// Never advances `current_step`: advancement is the validator's and
/// router's responsibility. On failure only `error` and `agent_reasoning`
/// are written.
#[derive(Debug, Clone)]
pub struct StepExecutor {
    artifacts_dir: PathBuf,
}

impl StepExecutor {
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifacts_dir: artifacts_dir.into(),
        }
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Execute exactly one step. With the plan already finished this is the
    /// idempotent terminal case: set `success` and return without side
    /// effects.
    pub async fn execute(&self, driver: &mut dyn BrowserDriver, state: &mut ExecutionState) {
        let Some(plan) = state.plan.as_ref() else {
            state.error = Some("No plan available".to_string());
            return;
        };

        let Some(step) = plan.get(state.current_step).cloned() else {
            state.success = true;
            return;
        };

        info!(
            step = state.current_step + 1,
            action = %step.action,
            target = %step.target,
            "executing step"
        );

        let record = match self.dispatch(driver, &step).await {
            Ok(record) => {
                if let Some(page_state) = record.page_state.as_ref() {
                    state.browser_state = page_state.clone();
                }
                if let Some(path) = record.path.as_ref() {
                    state.screenshots.push(path.clone());
                }
                info!(step = state.current_step + 1, "step executed successfully");
                record
            }
            Err(err) => {
                let failure = AgentError::execution(step.action.as_str(), err.to_string());
                let message = failure.to_string();
                error!(step = state.current_step + 1, error = %message, "step execution failed");
                state.error = Some(message.clone());
                ActionRecord {
                    success: false,
                    error: Some(message),
                    ..ActionRecord::default()
                }
            }
        };

        state.agent_reasoning = serde_json::to_string(&record).unwrap_or_default();
    }

    /// Pure mapping from action kind to collaborator call. Exhaustive over
    /// the closed action set.
    async fn dispatch(
        &self,
        driver: &mut dyn BrowserDriver,
        step: &Step,
    ) -> Result<ActionRecord, BrowserError> {
        match step.action {
            StepAction::Navigate => {
                let page = driver.navigate(&step.target).await?;
                Ok(ActionRecord::ok(format!("Navigated to {}", step.target), page))
            }
            StepAction::Fill | StepAction::FillForm => {
                match &step.data {
                    StepData::Fields { fields } => driver.fill_fields(fields).await?,
                    StepData::Value { value } => driver.fill(&step.target, value).await?,
                    _ => driver.fill(&step.target, "").await?,
                }
                let page = driver.page_state().await?;
                Ok(ActionRecord::ok(format!("Filled {}", step.target), page))
            }
            StepAction::Click => {
                driver.click(&step.target).await?;
                let page = driver.page_state().await?;
                Ok(ActionRecord::ok(format!("Clicked {}", step.target), page))
            }
            StepAction::Select => {
                let value = step.data.single_value().unwrap_or_default().to_string();
                driver.select_option(&step.target, &value).await?;
                let page = driver.page_state().await?;
                Ok(ActionRecord::ok(format!("Selected {value}"), page))
            }
            StepAction::Submit => {
                driver.submit_form(&step.target).await?;
                let page = driver.page_state().await?;
                Ok(ActionRecord::ok("Form submitted", page))
            }
            StepAction::Wait => {
                let timeout_ms = match step.data {
                    StepData::Wait { timeout_ms } => timeout_ms,
                    _ => DEFAULT_WAIT_TIMEOUT_MS,
                };
                driver.wait_for(&step.target, timeout_ms).await?;
                let page = driver.page_state().await?;
                Ok(ActionRecord::ok(format!("Element {} found", step.target), page))
            }
            StepAction::Extract => {
                let text = driver.extract_text(&step.target).await?;
                let page = driver.page_state().await?;
                let mut record = ActionRecord::ok(format!("Extracted from {}", step.target), page);
                record.text = Some(text);
                Ok(record)
            }
            StepAction::Screenshot => {
                let path = self
                    .artifacts_dir
                    .join(format!("step-{}.html", step.index + 1));
                let saved = driver.screenshot(&path).await?;
                let page = driver.page_state().await?;
                let mut record = ActionRecord::ok("Evidence captured", page);
                record.path = Some(saved);
                Ok(record)
            }
        }
    }
}
