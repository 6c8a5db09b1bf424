//! Step and plan model shared by every component of the control loop.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::json::extract_json_object;

/// Default timeout applied to `wait` steps that carry no explicit value.
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Closed set of browser actions a step may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Navigate,
    Fill,
    FillForm,
    Click,
    Select,
    Submit,
    Wait,
    Extract,
    Screenshot,
}

impl StepAction {
    /// Parse an action keyword, case-insensitively. Unknown keywords are
    /// rejected here so the dispatch match stays exhaustive.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "navigate" => Some(Self::Navigate),
            "fill" => Some(Self::Fill),
            "fill_form" => Some(Self::FillForm),
            "click" => Some(Self::Click),
            "select" => Some(Self::Select),
            "submit" => Some(Self::Submit),
            "wait" => Some(Self::Wait),
            "extract" => Some(Self::Extract),
            "screenshot" => Some(Self::Screenshot),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::Fill => "fill",
            Self::FillForm => "fill_form",
            Self::Click => "click",
            Self::Select => "select",
            Self::Submit => "submit",
            Self::Wait => "wait",
            Self::Extract => "extract",
            Self::Screenshot => "screenshot",
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed step payload, validated when the plan is constructed rather than
/// at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepData {
    /// No payload.
    None,
    /// Single value for `fill`/`select` against one locator.
    Value { value: String },
    /// Field-name to value map for multi-field form fills.
    Fields { fields: BTreeMap<String, String> },
    /// Timeout for `wait` steps.
    Wait { timeout_ms: u64 },
}

impl StepData {
    pub fn value(value: impl Into<String>) -> Self {
        Self::Value {
            value: value.into(),
        }
    }

    /// The single value carried by this payload, if any.
    pub fn single_value(&self) -> Option<&str> {
        match self {
            Self::Value { value } => Some(value.as_str()),
            _ => None,
        }
    }
}

/// One planned unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Position in the plan, 0-based, immutable once planned.
    pub index: usize,
    pub action: StepAction,
    /// Locator string; may encode several fallback locators, comma-joined.
    pub target: String,
    pub data: StepData,
    /// Human-readable description consumed by the validator heuristics and
    /// the judge prompt.
    pub expected_outcome: String,
}

impl Step {
    pub fn new(index: usize, action: StepAction, target: impl Into<String>) -> Self {
        Self {
            index,
            action,
            target: target.into(),
            data: StepData::None,
            expected_outcome: "Complete step".to_string(),
        }
    }

    pub fn with_data(mut self, data: StepData) -> Self {
        self.data = data;
        self
    }

    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.expected_outcome = outcome.into();
        self
    }
}

/// Ordered, non-empty sequence of steps produced for one task.
///
/// Immutable once produced; a new plan may only come from re-invoking the
/// plan generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    /// Build a plan from steps, re-assigning indices by position. Returns
    /// `None` for an empty step list.
    pub fn from_steps(mut steps: Vec<Step>) -> Option<Self> {
        if steps.is_empty() {
            return None;
        }
        for (index, step) in steps.iter_mut().enumerate() {
            step.index = index;
        }
        Some(Self { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Parse a generative planner response into a plan.
    ///
    /// Accepts either a well-formed JSON payload or the first balanced
    /// `{...}` object embedded in surrounding prose. Returns `None` when no
    /// usable steps come out — including when any step names an action
    /// outside the closed set, which invalidates the whole payload so step
    /// indices never silently shift.
    pub fn parse_response(raw: &str) -> Option<Self> {
        let payload: RawPlan = match serde_json::from_str(raw) {
            Ok(parsed) => parsed,
            Err(_) => {
                let extracted = extract_json_object(raw)?;
                serde_json::from_str(&extracted).ok()?
            }
        };

        let mut steps = Vec::with_capacity(payload.steps.len());
        for raw_step in payload.steps {
            steps.push(raw_step.into_step(steps.len())?);
        }
        Self::from_steps(steps)
    }
}

/// Wire shape of a generative plan payload.
#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    action: String,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    data: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    expected_outcome: Option<String>,
}

impl RawStep {
    /// Validate one wire step into the typed model. `None` when the action
    /// keyword is unknown.
    fn into_step(self, index: usize) -> Option<Step> {
        let action = StepAction::parse(&self.action)?;
        let data = typed_data(action, self.data.as_ref());
        let mut step = Step::new(index, action, self.target.unwrap_or_default()).with_data(data);
        if let Some(outcome) = self.expected_outcome {
            step = step.with_outcome(outcome);
        }
        Some(step)
    }
}

fn typed_data(action: StepAction, data: Option<&BTreeMap<String, serde_json::Value>>) -> StepData {
    match action {
        StepAction::Fill | StepAction::FillForm => match data {
            Some(map) if map.len() == 1 && map.contains_key("value") => {
                StepData::value(stringify(&map["value"]))
            }
            Some(map) if !map.is_empty() => StepData::Fields {
                fields: map
                    .iter()
                    .map(|(key, value)| (key.clone(), stringify(value)))
                    .collect(),
            },
            _ => StepData::value(""),
        },
        StepAction::Select => StepData::value(
            data.and_then(|map| map.get("value"))
                .map(stringify)
                .unwrap_or_default(),
        ),
        StepAction::Wait => StepData::Wait {
            timeout_ms: data
                .and_then(|map| map.get("timeout"))
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(DEFAULT_WAIT_TIMEOUT_MS),
        },
        _ => StepData::None,
    }
}

/// Render a JSON value as the plain string the browser collaborator expects.
fn stringify(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
