//! Orchestrator: wires planning, execution, validation, and routing into a
//! bounded loop and owns the browser session lifecycle.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::browser::BrowserDriver;
use crate::errors::AgentError;
use crate::executor::StepExecutor;
use crate::llm::LlmProvider;
use crate::planner::PlanGenerator;
use crate::retrieve::ContextRetriever;
use crate::router::{route, RouteDecision};
use crate::state::{ExecutionReport, ExecutionState};
use crate::validator::StepValidator;

/// Query used to seed the planner context from the knowledge retriever.
const CONTEXT_QUERY: &str = "login form username password";

/// Orchestrator tunables.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Hard outer ceiling on Execute-Validate-Route cycles; the router is
    /// expected to terminate well before this, and reaching it is a
    /// reportable anomaly.
    pub max_cycles: u32,
    /// Directory screenshot artifacts are written under.
    pub artifacts_dir: PathBuf,
    /// Snippets requested from the retriever before planning.
    pub context_k: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_cycles: 15,
            artifacts_dir: PathBuf::from("screenshots"),
            context_k: 5,
        }
    }
}

/// Runs one task execution end to end and produces the final result
/// record.
///
/// Owns the browser session exclusively for the duration of the run and
/// releases it on every exit path, including session-initialization
/// failures.
pub struct Orchestrator<D: BrowserDriver> {
    driver: D,
    llm: Arc<dyn LlmProvider>,
    retriever: Arc<dyn ContextRetriever>,
    config: OrchestratorConfig,
}

impl<D: BrowserDriver> Orchestrator<D> {
    pub fn new(driver: D, llm: Arc<dyn LlmProvider>, retriever: Arc<dyn ContextRetriever>) -> Self {
        Self::with_config(driver, llm, retriever, OrchestratorConfig::default())
    }

    pub fn with_config(
        driver: D,
        llm: Arc<dyn LlmProvider>,
        retriever: Arc<dyn ContextRetriever>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            driver,
            llm,
            retriever,
            config,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Execute one task against the owned browser session.
    pub async fn run(&mut self, task: &str, domain: &str) -> ExecutionReport {
        let mut state = ExecutionState::new(task, domain);
        info!(
            execution_id = %state.execution_id,
            task,
            domain,
            "starting execution"
        );

        if let Err(err) = self.driver.open().await {
            let failure = AgentError::session(err.to_string());
            error!(error = %failure, "browser session failed to initialize");
            state.error = Some(failure.to_string());
            self.teardown().await;
            return ExecutionReport::from(&state);
        }

        match self.retriever.search(CONTEXT_QUERY, self.config.context_k).await {
            Ok(snippets) => {
                info!(chunks = snippets.len(), "retrieved planning context");
                state.retrieved_context = snippets;
            }
            Err(err) => {
                warn!(error = %err, "context retrieval failed; planning without context");
            }
        }

        PlanGenerator::new()
            .generate(self.llm.as_ref(), &mut state)
            .await;

        let executor = StepExecutor::new(self.config.artifacts_dir.clone());
        let validator = StepValidator::new();

        let mut terminated = None;
        for cycle in 0..self.config.max_cycles {
            executor.execute(&mut self.driver, &mut state).await;
            validator.validate(self.llm.as_ref(), &mut state).await;

            match route(&mut state) {
                RouteDecision::Done(reason) => {
                    info!(cycle = cycle + 1, ?reason, "router terminated the loop");
                    terminated = Some(reason);
                    break;
                }
                RouteDecision::Continue => {}
            }
        }

        if terminated.is_none() {
            warn!(
                max_cycles = self.config.max_cycles,
                "outer cycle cap reached before router termination"
            );
            if !state.success && state.error.is_none() {
                state.error = Some(format!(
                    "cycle cap of {} reached without termination",
                    self.config.max_cycles
                ));
            }
        }

        self.teardown().await;

        info!(
            success = state.success,
            steps_completed = state.steps_completed.len(),
            screenshots = state.screenshots.len(),
            "execution complete"
        );
        ExecutionReport::from(&state)
    }

    /// Session release; failure to close is logged, never propagated.
    async fn teardown(&mut self) {
        if let Err(err) = self.driver.close().await {
            warn!(error = %err, "browser session close failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::MockBrowser;
    use crate::llm::MockLlmProvider;
    use crate::retrieve::NullRetriever;
    use webagent_core_types::PageState;

    const HN_TASK: &str = "Log into HackerNews. Username is 'bob'. Password is 'secret'.";
    const HN_DOMAIN: &str = "https://news.ycombinator.com/login";

    fn orchestrator(
        driver: MockBrowser,
        llm: MockLlmProvider,
    ) -> Orchestrator<MockBrowser> {
        Orchestrator::new(driver, Arc::new(llm), Arc::new(NullRetriever))
    }

    #[tokio::test]
    async fn heuristic_login_flow_completes() {
        let driver = MockBrowser::with_script([
            PageState::new(HN_DOMAIN, "Login", "<form><input name=\"acct\"></form>"),
            PageState::new("https://news.ycombinator.com/news", "HN", "<a>logout</a>"),
        ]);
        // Planning and every judge call fail: the heuristic fallback plus
        // validator recovery must still carry the run to completion.
        let mut orchestrator = orchestrator(driver, MockLlmProvider::failing());

        let report = orchestrator.run(HN_TASK, HN_DOMAIN).await;

        assert!(report.success);
        assert_eq!(report.screenshots.len(), 1);
        assert!(report.screenshots[0].ends_with("step-5.html"));
        assert!(orchestrator.driver().closed);
    }

    #[tokio::test]
    async fn session_failure_aborts_with_report() {
        let mut driver = MockBrowser::new();
        driver.fail_open = true;
        let mut orchestrator = orchestrator(driver, MockLlmProvider::failing());

        let report = orchestrator.run(HN_TASK, HN_DOMAIN).await;

        assert!(!report.success);
        assert!(report.error.as_deref().unwrap().contains("open failure"));
        assert!(report.steps_completed.is_empty());
        assert!(orchestrator.driver().closed, "teardown runs on the failure path");
    }

    #[tokio::test]
    async fn exhausted_retries_terminate_the_run() {
        let plan = r##"{"steps": [
            {"action": "select", "target": "#opt", "data": {"value": "x"}},
            {"action": "select", "target": "#opt", "data": {"value": "x"}},
            {"action": "select", "target": "#opt", "data": {"value": "x"}},
            {"action": "select", "target": "#opt", "data": {"value": "x"}},
            {"action": "select", "target": "#opt", "data": {"value": "x"}},
            {"action": "select", "target": "#opt", "data": {"value": "x"}}
        ]}"##;
        let retry = r#"{"success": false, "reason": "flaky", "should_retry": true}"#;
        let llm = MockLlmProvider::with_responses([plan, retry, retry, retry]);
        let driver = MockBrowser::new().fail_on("select");
        let mut orchestrator = orchestrator(driver, llm);

        let report = orchestrator.run(HN_TASK, HN_DOMAIN).await;

        assert!(!report.success);
        assert!(report.error.as_deref().unwrap().contains("select"));
    }

    #[tokio::test]
    async fn step_ceiling_bounds_pathological_plans() {
        // Twelve always-passing steps: the ceiling must fire at ten.
        let steps: Vec<String> = (0..12)
            .map(|_| "{\"action\": \"screenshot\", \"target\": \"s\"}".to_string())
            .collect();
        let plan = format!("{{\"steps\": [{}]}}", steps.join(","));
        let llm = MockLlmProvider::with_responses([plan]);
        let mut orchestrator = orchestrator(MockBrowser::new(), llm);

        let report = orchestrator.run("screenshot everything", "https://a.example").await;

        assert!(!report.success);
        assert_eq!(report.steps_completed.len(), 10);
    }

    #[tokio::test]
    async fn outer_cap_is_the_last_line_of_defense() {
        // A judge that forever answers "retry" with a healthy browser makes
        // the router spin on the same step; only the outer cap stops it.
        let plan = r##"{"steps": [
            {"action": "select", "target": "#opt", "data": {"value": "x"}},
            {"action": "select", "target": "#opt", "data": {"value": "x"}},
            {"action": "select", "target": "#opt", "data": {"value": "x"}},
            {"action": "select", "target": "#opt", "data": {"value": "x"}}
        ]}"##;
        let retry = r#"{"success": false, "reason": "transient", "should_retry": true}"#;
        let mut responses = vec![plan.to_string()];
        responses.extend(std::iter::repeat(retry.to_string()).take(20));
        let llm = MockLlmProvider::with_responses(responses);
        let mut orchestrator = orchestrator(MockBrowser::new(), llm);

        let report = orchestrator.run("select something", "https://a.example").await;

        assert!(!report.success);
        assert!(report.error.as_deref().unwrap().contains("cycle cap"));
    }
}
