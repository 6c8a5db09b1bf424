//! Plan generator: generative planning with a deterministic heuristic
//! fallback.

mod heuristic;

pub use heuristic::{extract_credential, heuristic_plan};

use tracing::{info, warn};

use crate::errors::AgentError;
use crate::llm::LlmProvider;
use crate::plan::Plan;
use crate::retrieve::ContextSnippet;
use crate::state::ExecutionState;

/// Longest context prefix embedded in the planner prompt.
const CONTEXT_PREFIX_LIMIT: usize = 2000;

/// Produces a non-empty plan for a `(task, domain, context)` triple.
///
/// Never fails outward: a malformed generative response, an inference
/// error, or an empty step list all route into the deterministic heuristic
/// fallback, which is total.
#[derive(Debug, Default, Clone)]
pub struct PlanGenerator;

impl PlanGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Plan the task, writing `plan`, `current_step = 0`, and an empty
    /// `steps_completed` into the state.
    pub async fn generate(&self, llm: &dyn LlmProvider, state: &mut ExecutionState) {
        // The fallback is an explicit second branch, not a catch-all, so
        // the decision itself stays testable.
        let plan = match self.generative_plan(llm, state).await {
            Ok(plan) => {
                info!(steps = plan.len(), "generative plan accepted");
                plan
            }
            Err(err) => {
                warn!(error = %err, "using heuristic fallback");
                heuristic_plan(&state.task, &state.domain)
            }
        };

        state.plan = Some(plan);
        state.current_step = 0;
        state.steps_completed.clear();
    }

    async fn generative_plan(
        &self,
        llm: &dyn LlmProvider,
        state: &ExecutionState,
    ) -> Result<Plan, AgentError> {
        let prompt = build_planner_prompt(&state.task, &state.domain, &state.retrieved_context);
        let response = llm
            .infer(&prompt)
            .await
            .map_err(|err| AgentError::planning(err.to_string()))?;

        Plan::parse_response(response.trim()).ok_or_else(|| {
            let preview: String = response.chars().take(100).collect();
            AgentError::planning(format!("response yielded no steps: {preview}"))
        })
    }
}

/// Planner prompt embedding task, domain, and a bounded context prefix.
fn build_planner_prompt(task: &str, domain: &str, context: &[ContextSnippet]) -> String {
    let joined = context
        .iter()
        .map(|snippet| snippet.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let prefix: String = joined.chars().take(CONTEXT_PREFIX_LIMIT).collect();

    format!(
        "You are a precise web automation planner.\n\
         TASK: {task}\n\
         URL: {domain}\n\
         \n\
         CONTEXT (scraped HTML):\n\
         {prefix}\n\
         \n\
         INSTRUCTIONS:\n\
         1. Analyze the CONTEXT to find input names/ids for the task.\n\
         2. HackerNews uses name='acct' (user) and name='pw' (pass).\n\
         3. Standard sites use name='username', 'email', 'password'.\n\
         4. Output a JSON plan and nothing else.\n\
         \n\
         OUTPUT JSON format:\n\
         {{\n\
           \"steps\": [\n\
             {{ \"action\": \"navigate\", \"target\": \"{domain}\", \"expected_outcome\": \"Page loaded\" }},\n\
             {{ \"action\": \"fill\", \"target\": \"SELECTOR\", \"data\": {{ \"value\": \"VALUE\" }} }},\n\
             {{ \"action\": \"click\", \"target\": \"SELECTOR\" }}\n\
           ]\n\
         }}"
    )
}
