//! Router: the decision function evaluated once per cycle after validation.

use tracing::{info, warn};

use crate::state::ExecutionState;

/// Error-driven continuations the router permits before forcing
/// termination.
pub const MAX_RETRIES: u32 = 2;

/// Absolute cap on `current_step`, independent of plan length, guarding
/// against runaway plans.
pub const STEP_CEILING: usize = 10;

/// Why the router terminated the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Hard failure: an error was still set with the retry budget spent.
    RetriesExhausted,
    /// Normal completion.
    Completed,
    /// `current_step` hit the global ceiling.
    StepCeiling,
}

/// Outcome of one routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Execute the step at `current_step` next cycle.
    Continue,
    Done(TerminationReason),
}

impl RouteDecision {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

/// Decide whether to retry, advance, or terminate.
///
/// Rules are evaluated in this exact precedence; the first match wins:
/// 1. error set and retries exhausted → done (hard failure);
/// 2. success, or the plan is finished → done (success forced true);
/// 3. step ceiling reached → done;
/// 4. error set with retries remaining → forgive: bump `retries`, clear
///    the error, and re-execute the same step (no replanning, no advance);
/// 5. otherwise continue to the next step.
pub fn route(state: &mut ExecutionState) -> RouteDecision {
    if state.error.is_some() && state.retries >= MAX_RETRIES {
        warn!(
            retries = state.retries,
            error = state.error.as_deref().unwrap_or(""),
            "stopping: retries exhausted"
        );
        return RouteDecision::Done(TerminationReason::RetriesExhausted);
    }

    if state.success || state.current_step >= state.plan_len() {
        state.success = true;
        info!("workflow completed successfully");
        return RouteDecision::Done(TerminationReason::Completed);
    }

    if state.current_step >= STEP_CEILING {
        warn!(current_step = state.current_step, "global step limit reached");
        return RouteDecision::Done(TerminationReason::StepCeiling);
    }

    if state.error.is_some() {
        state.retries += 1;
        warn!(
            attempt = state.retries,
            error = state.error.as_deref().unwrap_or(""),
            "error encountered but continuing"
        );
        state.error = None;
        return RouteDecision::Continue;
    }

    RouteDecision::Continue
}
