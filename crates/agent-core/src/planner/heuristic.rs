//! Deterministic keyword-heuristic fallback planner.
//!
//! Total and model-free: this is the safety net behind every generative
//! planning failure, so it must produce the same plan for the same input
//! every time.

use crate::plan::{Plan, Step, StepAction, StepData};

/// Common username-field locators, broadest first.
const USERNAME_LOCATORS: &str =
    "input[name='acct'], input[name='username'], input[name='email'], #username, #email";

/// Common password-field locators.
const PASSWORD_LOCATORS: &str = "input[name='pw'], input[name='password'], #password, #pass";

/// Common submit-button locators.
const SUBMIT_LOCATORS: &str = "input[type='submit'], button[type='submit'], #loginbtn, \
                               button:has-text('Log in'), button:has-text('Sign in')";

const USERNAME_KEYS: &[&str] = &["username", "user", "id"];
const PASSWORD_KEYS: &[&str] = &["password", "pass"];

/// Sentinel used when the task text carries no recognizable credential.
const UNKNOWN_VALUE: &str = "unknown_value";

/// Build a plan from task keywords alone, without site-specific knowledge.
///
/// Always starts with a `navigate` to the domain and ends with a `click`
/// on common submit locators plus a final `screenshot`; `fill` steps are
/// inserted when the task text mentions user/login or password material.
pub fn heuristic_plan(task: &str, domain: &str) -> Plan {
    let task_lower = task.to_lowercase();
    let mut steps = vec![Step::new(0, StepAction::Navigate, domain).with_outcome("Page loaded")];

    if task_lower.contains("user") || task_lower.contains("login") {
        steps.push(
            Step::new(steps.len(), StepAction::Fill, USERNAME_LOCATORS)
                .with_data(StepData::value(extract_credential(task, USERNAME_KEYS)))
                .with_outcome("Username filled"),
        );
    }

    if task_lower.contains("pass") {
        steps.push(
            Step::new(steps.len(), StepAction::Fill, PASSWORD_LOCATORS)
                .with_data(StepData::value(extract_credential(task, PASSWORD_KEYS)))
                .with_outcome("Password filled"),
        );
    }

    steps.push(
        Step::new(steps.len(), StepAction::Click, SUBMIT_LOCATORS).with_outcome("Form submitted"),
    );
    steps.push(
        Step::new(steps.len(), StepAction::Screenshot, "final_result")
            .with_outcome("Evidence captured"),
    );

    Plan::from_steps(steps).expect("heuristic plan is never empty")
}

/// Positional credential extraction: scan words, and for any word
/// containing one of `keys`, return the word two positions later with
/// surrounding quote characters (and trailing punctuation) stripped.
///
/// Matches "username is 'bob'" → "bob". Falls back to a sentinel when
/// nothing matches.
pub fn extract_credential(text: &str, keys: &[&str]) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    for (i, word) in words.iter().enumerate() {
        let lower = word.to_lowercase();
        if keys.iter().any(|key| lower.contains(key)) && i + 2 < words.len() {
            let value = words[i + 2]
                .trim_end_matches(|c| c == '.' || c == ',')
                .trim_matches(|c| c == '\'' || c == '"');
            return value.to_string();
        }
    }
    UNKNOWN_VALUE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HN_TASK: &str = "Log into HackerNews. Username is 'bob'. Password is 'secret'.";
    const HN_DOMAIN: &str = "https://news.ycombinator.com/login";

    #[test]
    fn login_task_yields_full_plan() {
        let plan = heuristic_plan(HN_TASK, HN_DOMAIN);
        let actions: Vec<StepAction> = plan.steps().iter().map(|s| s.action).collect();
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
        assert_eq!(plan.get(0).unwrap().target, HN_DOMAIN);
        assert_eq!(plan.get(1).unwrap().data, StepData::value("bob"));
        assert_eq!(plan.get(2).unwrap().data, StepData::value("secret"));
    }

    #[test]
    fn fallback_is_deterministic() {
        let first = heuristic_plan(HN_TASK, HN_DOMAIN);
        let second = heuristic_plan(HN_TASK, HN_DOMAIN);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn task_without_credentials_still_plans() {
        let plan = heuristic_plan("Take a screenshot of the front page", "https://a.example");
        let actions: Vec<StepAction> = plan.steps().iter().map(|s| s.action).collect();
        assert_eq!(
            actions,
            vec![StepAction::Navigate, StepAction::Click, StepAction::Screenshot]
        );
    }

    #[test]
    fn password_only_task_skips_username_step() {
        let plan = heuristic_plan("Enter the passphrase 'hunter2' here", "https://a.example");
        // "pass" matches, "user"/"login" do not.
        assert_eq!(plan.len(), 4);
        assert_eq!(plan.get(1).unwrap().target, PASSWORD_LOCATORS);
    }

    #[test]
    fn extraction_strips_quotes_and_punctuation() {
        assert_eq!(
            extract_credential("Username is 'bob'.", USERNAME_KEYS),
            "bob"
        );
        assert_eq!(
            extract_credential("password is \"s3cret\",", PASSWORD_KEYS),
            "s3cret"
        );
    }

    #[test]
    fn extraction_defaults_to_sentinel() {
        assert_eq!(extract_credential("no credentials here", PASSWORD_KEYS), UNKNOWN_VALUE);
        // Keyword present but no word two positions later.
        assert_eq!(extract_credential("the username is", USERNAME_KEYS), UNKNOWN_VALUE);
    }

    #[test]
    fn indices_are_contiguous() {
        let plan = heuristic_plan(HN_TASK, HN_DOMAIN);
        for (expected, step) in plan.steps().iter().enumerate() {
            assert_eq!(step.index, expected);
        }
    }
}
