use crate::action::Action;
use crate::response::{ResponseSchema, StructuredResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use strum::{Display, EnumString};

/// How the observed actions are compared against the ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionMatch {
    /// The considered actions must equal the ground truth, in order.
    ExactSequence,
    /// Every ground-truth action must appear; order is irrelevant and
    /// extra actions are tolerated unless they conflict.
    #[default]
    Containment,
}

/// When an extraneous state-mutating action fails the task under containment matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConflictPolicy {
    /// Conflicts when it touches a resource the ground truth also touches.
    #[default]
    SharedResource,
    /// Any extraneous write conflicts.
    AnyWrite,
    /// Extraneous writes never conflict.
    Ignore,
}

/// How action-level and output-level scores become the final scalar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardCombination {
    /// 1.0 only if both checks pass, else 0.0.
    #[default]
    StrictAnd,
    /// Weighted mean of the two partial scores.
    Weighted {
        action_weight: f64,
        output_weight: f64,
    },
}

/// The explicit scoring policy of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardPolicy {
    #[serde(default)]
    pub action_match: ActionMatch,
    #[serde(default)]
    pub conflict: ConflictPolicy,
    #[serde(default)]
    pub combination: RewardCombination,
    /// Leave read-only operations out of the action comparison.
    #[serde(default = "default_ignore_reads")]
    pub ignore_reads: bool,
    /// Argument names that identify a resource under
    /// [`ConflictPolicy::SharedResource`]. A leading `*` matches any prefix,
    /// so `*_id` covers `booking_id` and `passenger_id`.
    #[serde(default = "default_resource_keys")]
    pub resource_keys: Vec<String>,
}

fn default_ignore_reads() -> bool {
    true
}

fn default_resource_keys() -> Vec<String> {
    vec!["*_id".to_string(), "flight".to_string()]
}

impl RewardPolicy {
    /// Whether an argument named `key` identifies a resource.
    pub fn is_resource_key(&self, key: &str) -> bool {
        self.resource_keys.iter().any(|pattern| match pattern.strip_prefix('*') {
            Some(suffix) => key.ends_with(suffix),
            None => key == pattern,
        })
    }
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            action_match: ActionMatch::default(),
            conflict: ConflictPolicy::default(),
            combination: RewardCombination::default(),
            ignore_reads: default_ignore_reads(),
            resource_keys: default_resource_keys(),
        }
    }
}

/// A single, self-contained benchmark task.
/// This struct is designed to be deserialized from a YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// A unique identifier for the task (e.g. "airline-book-001").
    pub id: String,
    /// The domain whose backend the task runs against.
    #[serde(default = "default_domain")]
    pub domain: String,
    /// The simulated customer, when the domain has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Hidden instruction given to the user simulator.
    pub instruction: String,
    /// Snapshot the backend is reset to before the run.
    #[serde(default)]
    pub initial_state: Value,
    /// Ground-truth actions.
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Expected final structured answer, if the task has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<StructuredResponse>,
    /// Schema of the final answer; derived from `expected_output` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<ResponseSchema>,
    #[serde(default)]
    pub policy: RewardPolicy,
    /// Per-task override of the agent turn budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

fn default_domain() -> String {
    "airline".to_string()
}

impl Task {
    /// Create a minimal task; the remaining fields can be set directly.
    pub fn new(id: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            domain: default_domain(),
            user_id: None,
            instruction: instruction.into(),
            initial_state: Value::Null,
            actions: Vec::new(),
            expected_output: None,
            output_schema: None,
            policy: RewardPolicy::default(),
            max_turns: None,
            tags: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// The schema the final answer is validated against, if the task expects one.
    pub fn response_schema(&self) -> Option<ResponseSchema> {
        self.output_schema.clone().or_else(|| {
            self.expected_output
                .as_ref()
                .map(ResponseSchema::from_expected)
        })
    }
}
