//! Step validator: heuristic-first pass/fail judgement with a generative
//! judge fallback.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AgentError;
use crate::json::extract_json_object;
use crate::llm::LlmProvider;
use crate::plan::{Step, StepAction};
use crate::state::ExecutionState;

/// URL fragment identifying the login page.
const LOGIN_PATH_MARKER: &str = "login/index.php";

/// Markers whose absence after a click/submit signals the form went away.
const LOGIN_FORM_MARKERS: &[&str] = &["#login", "#username"];

/// Page keywords that indicate a signed-in session.
const POST_LOGIN_MARKERS: &[&str] = &[
    "dashboard", "profile", "welcome", "logout", "student", "courses",
];

/// Failed steps below this index are force-advanced instead of stalling
/// the run.
const EARLY_ADVANCE_LIMIT: usize = 3;

/// Judge-crash recovery auto-advances steps at or below this index.
const RECOVERY_ADVANCE_LIMIT: usize = 4;

/// Judgement emitted by either validation tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub success: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub should_retry: bool,
}

impl Verdict {
    fn pass(reason: impl Into<String>) -> Self {
        Self {
            success: true,
            reason: reason.into(),
            should_retry: false,
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: reason.into(),
            should_retry: false,
        }
    }
}

/// Judges whether the just-executed step satisfied its expected outcome
/// and advances `current_step` on success.
#[derive(Debug, Default, Clone)]
pub struct StepValidator;

impl StepValidator {
    pub fn new() -> Self {
        Self
    }

    pub async fn validate(&self, llm: &dyn LlmProvider, state: &mut ExecutionState) {
        let plan_len = state.plan_len();
        if state.current_step >= plan_len {
            state.success = true;
            info!("all steps completed");
            return;
        }

        let Some(step) = state
            .plan
            .as_ref()
            .and_then(|plan| plan.get(state.current_step))
            .cloned()
        else {
            state.success = true;
            return;
        };

        let page_content = state.page_content_lower();
        let url = state.browser_state.url.to_lowercase();

        let verdict =
            match heuristic_verdict(&step, &page_content, &url, state.current_step) {
                Some(verdict) => verdict,
                // Generative tier only when the heuristics came up empty.
                None => match self.judge(llm, &step, state).await {
                    Ok(verdict) => verdict,
                    Err(message) => {
                        self.recover(state, &message);
                        return;
                    }
                },
            };

        self.apply(state, plan_len, verdict);
    }

    /// Ask the generative judge. `Err` means the inference call itself
    /// failed; a parseable-but-negative answer is a normal verdict.
    async fn judge(
        &self,
        llm: &dyn LlmProvider,
        step: &Step,
        state: &ExecutionState,
    ) -> Result<Verdict, String> {
        let page_state = serde_json::to_string(&state.browser_state).unwrap_or_default();
        let prompt = build_judge_prompt(
            &step.expected_outcome,
            &page_state,
            state.error.as_deref().unwrap_or("None"),
        );

        let response = llm.infer(&prompt).await.map_err(|err| err.to_string())?;
        Ok(parse_verdict(&response)
            .unwrap_or_else(|| Verdict::fail("judge returned no parseable verdict")))
    }

    fn apply(&self, state: &mut ExecutionState, plan_len: usize, verdict: Verdict) {
        if verdict.success {
            state.steps_completed.push(state.current_step);
            state.current_step += 1;
            info!(
                step = state.current_step,
                reason = %verdict.reason,
                "step validated"
            );
            if state.current_step >= plan_len {
                state.success = true;
                info!("validation complete: all steps finished successfully");
            }
            return;
        }

        warn!(
            step = state.current_step + 1,
            reason = %verdict.reason,
            "step failed validation"
        );
        if !verdict.should_retry {
            state.error = Some(if verdict.reason.is_empty() {
                "Validation failed".to_string()
            } else {
                verdict.reason
            });
            // Bounded leniency: early steps are skipped rather than
            // allowed to stall the whole run.
            if state.current_step < EARLY_ADVANCE_LIMIT {
                state.current_step += 1;
                state.error = None;
            }
        }
    }

    /// Local recovery when the judge call itself blew up.
    fn recover(&self, state: &mut ExecutionState, message: &str) {
        if state.current_step <= RECOVERY_ADVANCE_LIMIT {
            state.current_step += 1;
            info!(step = state.current_step, "auto-advance after validator error");
        } else {
            state.error = Some(AgentError::validation(message).to_string());
        }
    }
}

/// Fast rule table keyed by action; `Some` only on success, so a miss
/// falls through to the judge.
fn heuristic_verdict(
    step: &Step,
    page_content: &str,
    url: &str,
    current_step: usize,
) -> Option<Verdict> {
    let target = step.target.to_lowercase();

    match step.action {
        StepAction::Navigate => {
            if url.contains(LOGIN_PATH_MARKER) {
                return Some(Verdict::pass("On login page"));
            }
        }
        StepAction::Fill | StepAction::FillForm => {
            // Locator visible in the snapshot is a proxy for "the field
            // exists and the page didn't error out".
            let clean_target = target.replace(|c| c == '#' || c == '.', "");
            if page_content.contains(&clean_target) || page_content.contains(&target) {
                return Some(Verdict::pass(format!("Filled {}", step.target)));
            }
        }
        StepAction::Click | StepAction::Submit => {
            let no_login_form = LOGIN_FORM_MARKERS
                .iter()
                .all(|marker| !page_content.contains(marker));
            let page_changed = !url.contains(LOGIN_PATH_MARKER);
            if no_login_form || page_changed {
                return Some(Verdict::pass("Form submitted/page changed"));
            }
        }
        StepAction::Screenshot => {
            return Some(Verdict::pass("Screenshot completed"));
        }
        StepAction::Select | StepAction::Wait | StepAction::Extract => {}
    }

    // Post-submit, signed-in content anywhere on the page independently
    // flags success.
    if current_step >= 3
        && POST_LOGIN_MARKERS
            .iter()
            .any(|marker| page_content.contains(marker))
    {
        return Some(Verdict::pass("Post-login content detected"));
    }

    None
}

fn parse_verdict(response: &str) -> Option<Verdict> {
    let trimmed = response.trim();
    if let Ok(verdict) = serde_json::from_str(trimmed) {
        return Some(verdict);
    }
    let extracted = extract_json_object(trimmed)?;
    serde_json::from_str(&extracted).ok()
}

fn build_judge_prompt(expected_outcome: &str, page_state: &str, error: &str) -> String {
    format!(
        "Precise web automation step validator.\n\
         \n\
         Expected Outcome: {expected_outcome}\n\
         Page State: {page_state}\n\
         Error: {error}\n\
         \n\
         SUCCESS RULES:\n\
         - Navigate: current URL contains \"{LOGIN_PATH_MARKER}\"\n\
         - Fill: target field value matches data\n\
         - Click/Submit: target no longer exists OR page changes\n\
         - Post-login: \"dashboard\", \"profile\", \"welcome\", \"logout\" OR no \"#login\"/\"#username\"\n\
         - Screenshot: file saved\n\
         \n\
         Output ONLY JSON:\n\
         {{\"success\": true/false, \"reason\": \"brief\", \"should_retry\": false}}"
    )
}
