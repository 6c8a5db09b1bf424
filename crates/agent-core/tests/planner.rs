//! Planner behavior through the public API, under adversarial model
//! output.

use agent_core::{ExecutionState, MockLlmProvider, PlanGenerator, StepAction};

const TASK: &str = "Log into HackerNews. Username is 'bob'. Password is 'secret'.";
const DOMAIN: &str = "https://news.ycombinator.com/login";

async fn plan_with(response: &str) -> ExecutionState {
    let llm = MockLlmProvider::with_responses([response]);
    let mut state = ExecutionState::new(TASK, DOMAIN);
    PlanGenerator::new().generate(&llm, &mut state).await;
    state
}

#[tokio::test]
async fn every_adversarial_response_yields_a_nonempty_plan() {
    let adversarial = [
        "",
        "null",
        "[]",
        "{\"steps\": []}",
        "{\"steps\": \"not an array\"}",
        "{\"steps\": [{\"action\": \"levitate\"}]}",
        "{\"steps\": [{\"target\": \"#x\"}]}",
        "I refuse to produce JSON.",
        "{ broken json",
        "``` nothing here ```",
    ];

    for response in adversarial {
        let state = plan_with(response).await;
        let plan = state.plan.expect("plan always produced");
        assert!(plan.len() >= 1, "empty plan for response {response:?}");
        assert_eq!(state.current_step, 0);
    }
}

#[tokio::test]
async fn fallback_credentials_survive_model_outage() {
    let llm = MockLlmProvider::failing();
    let mut state = ExecutionState::new(TASK, DOMAIN);
    PlanGenerator::new().generate(&llm, &mut state).await;

    let plan = state.plan.expect("fallback plan");
    let actions: Vec<StepAction> = plan.steps().iter().map(|step| step.action).collect();
    assert_eq!(
        actions,
        vec![
            StepAction::Navigate,
            StepAction::Fill,
            StepAction::Fill,
            StepAction::Click,
            StepAction::Screenshot,
        ]
    );
    assert_eq!(plan.get(1).unwrap().data.single_value(), Some("bob"));
    assert_eq!(plan.get(2).unwrap().data.single_value(), Some("secret"));
}

#[tokio::test]
async fn well_formed_response_wins_over_fallback() {
    let state = plan_with(
        "Sure, here you go:\n```json\n{\"steps\": [\
         {\"action\": \"navigate\", \"target\": \"https://news.ycombinator.com/login\"},\
         {\"action\": \"fill\", \"target\": \"input[name='acct']\", \"data\": {\"value\": \"bob\"}},\
         {\"action\": \"screenshot\", \"target\": \"done\"}]}\n```",
    )
    .await;

    let plan = state.plan.expect("parsed plan");
    assert_eq!(plan.len(), 3);
    assert_eq!(plan.get(1).unwrap().action, StepAction::Fill);
}
