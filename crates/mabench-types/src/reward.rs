use crate::action::Action;
use crate::env::{EnvRunResult, TerminationReason};
use crate::task::ActionMatch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Action-level diagnostics of a scored run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardActionInfo {
    /// Policy the comparison used.
    pub policy: ActionMatch,
    /// Ground-truth actions found in the trajectory.
    pub matched: Vec<Action>,
    /// Ground-truth actions the agent never successfully applied.
    pub missing: Vec<Action>,
    /// Applied actions beyond the ground truth.
    pub extraneous: Vec<Action>,
    /// Extraneous actions that conflict with the ground truth's side effects.
    pub conflicts: Vec<Action>,
    /// Partial action score in [0, 1].
    pub score: f64,
    pub passed: bool,
}

/// Field-level comparison of the final response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCheck {
    pub name: String,
    pub expected: Value,
    pub actual: Option<Value>,
    pub matched: bool,
}

/// Output-level diagnostics of a scored run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardOutputInfo {
    /// Whether the task expects a structured output at all.
    pub expected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    pub fields: Vec<FieldCheck>,
    /// Partial output score in [0, 1].
    pub score: f64,
    pub passed: bool,
}

/// Deterministic result of scoring a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardResult {
    /// Final scalar in [0, 1].
    pub reward: f64,
    pub actions: RewardActionInfo,
    pub output: RewardOutputInfo,
    /// Set when a fatal termination zeroed the reward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voided_by: Option<TerminationReason>,
}

impl RewardResult {
    /// Zero the scalar because of a fatal termination, keeping the diagnostics.
    pub fn void(mut self, reason: TerminationReason) -> Self {
        self.reward = 0.0;
        self.voided_by = Some(reason);
        self
    }
}

/// Agent-level metadata of a solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveMetadata {
    pub run_id: Uuid,
    pub agent: String,
    pub user: String,
    pub turns: u32,
    /// Cost reported by the agent policy, if it tracks one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
}

/// The terminal artifact of one task run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResult {
    pub task_id: String,
    pub reward: RewardResult,
    pub run: EnvRunResult,
    pub metadata: SolveMetadata,
}

impl SolveResult {
    pub fn succeeded(&self) -> bool {
        self.reward.reward >= 1.0
    }

    pub fn termination(&self) -> TerminationReason {
        self.run.termination
    }
}
