use crate::backend::{StateStore, ToolRegistry};
use mabench_types::{
    Action, ActionMatch, ConflictPolicy, EnvRunResult, FieldCheck, ResponseOutcome,
    RewardActionInfo, RewardCombination, RewardOutputInfo, RewardPolicy, RewardResult, StepOutcome,
    StructuredResponse, Task, TrajectoryStep,
};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

/// Deterministic scorer of completed runs.
///
/// The only state is the set of read-only operation names of the domain,
/// used to drop queries from the comparison when a task asks for it.
/// `compute` is a pure function of its inputs: scoring the same triple twice
/// yields identical results.
#[derive(Debug, Clone, Default)]
pub struct RewardEngine {
    read_only: BTreeSet<String>,
}

impl RewardEngine {
    pub fn new(read_only: BTreeSet<String>) -> Self {
        Self { read_only }
    }

    /// An engine that knows which operations of `registry` are read-only.
    pub fn for_registry<S: StateStore>(registry: &ToolRegistry<S>) -> Self {
        Self::new(registry.read_only_names())
    }

    /// Score a finished run, voiding the reward when it ended fatally.
    pub fn score_run(&self, task: &Task, run: &EnvRunResult) -> RewardResult {
        let result = self.compute(task, &run.trajectory, &run.response);
        if run.termination.is_fatal() {
            info!(
                task_id = %task.id,
                termination = %run.termination,
                "Reward voided by fatal termination"
            );
            return result.void(run.termination);
        }
        result
    }

    /// Calculates the reward of a trajectory and final response against the
    /// task's ground truth.
    ///
    /// 1. The action score compares the successfully applied actions with the
    ///    ground truth under the task's [`ActionMatch`] and [`ConflictPolicy`].
    /// 2. The output score compares the parsed final response field by field
    ///    with the expected output, if the task has one.
    /// 3. The two are combined as the task's [`RewardCombination`] states.
    pub fn compute(
        &self,
        task: &Task,
        trajectory: &[TrajectoryStep],
        response: &ResponseOutcome,
    ) -> RewardResult {
        let actions = self.score_actions(task, trajectory);
        let output = score_output(task.expected_output.as_ref(), response);

        let reward = match task.policy.combination {
            RewardCombination::StrictAnd => {
                if actions.passed && output.passed {
                    1.0
                } else {
                    0.0
                }
            }
            RewardCombination::Weighted {
                action_weight,
                output_weight,
            } => {
                let total = action_weight + output_weight;
                if total > 0.0 {
                    ((action_weight * actions.score + output_weight * output.score) / total)
                        .clamp(0.0, 1.0)
                } else {
                    0.0
                }
            }
        };

        debug!(
            task_id = %task.id,
            action_score = actions.score,
            output_score = output.score,
            reward,
            "Computed reward"
        );

        RewardResult {
            reward,
            actions,
            output,
            voided_by: None,
        }
    }

    fn considered(&self, task: &Task, action: &Action) -> bool {
        !(task.policy.ignore_reads && self.read_only.contains(&action.name))
    }

    fn score_actions(&self, task: &Task, trajectory: &[TrajectoryStep]) -> RewardActionInfo {
        let ground_truth: Vec<&Action> = task
            .actions
            .iter()
            .filter(|action| self.considered(task, action))
            .collect();
        let observed: Vec<&TrajectoryStep> = trajectory
            .iter()
            .filter(|step| matches!(step.outcome, StepOutcome::Applied { .. }))
            .filter(|step| self.considered(task, &step.action))
            .collect();

        // Multiset matching: each ground-truth action is consumed at most once.
        let mut remaining: HashMap<&Action, usize> = HashMap::new();
        for action in &ground_truth {
            *remaining.entry(*action).or_default() += 1;
        }
        let mut matched = Vec::new();
        let mut extraneous: Vec<&TrajectoryStep> = Vec::new();
        for step in observed.iter().copied() {
            match remaining.get_mut(&step.action) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    matched.push(step.action.clone());
                }
                _ => extraneous.push(step),
            }
        }
        let mut missing = Vec::new();
        let mut unmatched = remaining;
        for action in &ground_truth {
            if let Some(count) = unmatched.get_mut(*action) {
                if *count > 0 {
                    *count -= 1;
                    missing.push((*action).clone());
                }
            }
        }

        let policy = task.policy.action_match;
        let (conflicts, score, passed) = match policy {
            ActionMatch::ExactSequence => {
                let passed = observed.len() == ground_truth.len()
                    && observed
                        .iter()
                        .zip(&ground_truth)
                        .all(|(step, expected)| step.action == **expected);
                (Vec::new(), if passed { 1.0 } else { 0.0 }, passed)
            }
            ActionMatch::Containment => {
                let conflicts: Vec<Action> = extraneous
                    .iter()
                    .filter(|step| step.mutating)
                    .filter(|step| {
                        conflicts_with(&task.policy, &step.action, &ground_truth)
                    })
                    .map(|step| step.action.clone())
                    .collect();
                let score = if !conflicts.is_empty() {
                    0.0
                } else if ground_truth.is_empty() {
                    1.0
                } else {
                    matched.len() as f64 / ground_truth.len() as f64
                };
                let passed = missing.is_empty() && conflicts.is_empty();
                (conflicts, score, passed)
            }
        };

        RewardActionInfo {
            policy,
            matched,
            missing,
            extraneous: extraneous.iter().map(|step| step.action.clone()).collect(),
            conflicts,
            score,
            passed,
        }
    }
}

/// Whether an extraneous write conflicts with the ground truth.
fn conflicts_with(policy: &RewardPolicy, action: &Action, ground_truth: &[&Action]) -> bool {
    match policy.conflict {
        ConflictPolicy::Ignore => false,
        ConflictPolicy::AnyWrite => true,
        ConflictPolicy::SharedResource => {
            let touched: BTreeSet<(&str, String)> =
                ground_truth.iter().flat_map(|a| resources(policy, a)).collect();
            resources(policy, action).any(|resource| touched.contains(&resource))
        }
    }
}

/// Resource identifiers an action refers to, named by the policy's resource keys.
fn resources<'a>(
    policy: &'a RewardPolicy,
    action: &'a Action,
) -> impl Iterator<Item = (&'a str, String)> + 'a {
    action
        .arguments
        .iter()
        .filter(move |(key, _)| policy.is_resource_key(key))
        .map(|(key, value)| (key.as_str(), resource_key(value)))
}

fn resource_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_uppercase(),
        Value::Number(n) if n.as_f64() == Some(0.0) => "0".to_string(),
        other => other.to_string(),
    }
}

fn score_output(
    expected: Option<&StructuredResponse>,
    response: &ResponseOutcome,
) -> RewardOutputInfo {
    let Some(expected) = expected else {
        return RewardOutputInfo {
            expected: false,
            parse_error: None,
            fields: Vec::new(),
            score: 1.0,
            passed: true,
        };
    };

    let (actual, parse_error) = match response {
        ResponseOutcome::Parsed(actual) => (Some(actual), None),
        ResponseOutcome::Failed(failure) => (None, Some(failure.to_string())),
        ResponseOutcome::Missing => (None, Some("no final response was given".to_string())),
    };

    let fields: Vec<FieldCheck> = expected
        .fields
        .iter()
        .map(|(name, expected_value)| {
            let actual_value = actual.and_then(|a| a.get(name)).cloned();
            let matched = actual_value
                .as_ref()
                .is_some_and(|value| values_match(expected_value, value));
            FieldCheck {
                name: name.clone(),
                expected: expected_value.clone(),
                actual: actual_value,
                matched,
            }
        })
        .collect();

    let hits = fields.iter().filter(|f| f.matched).count();
    let score = if actual.is_none() {
        0.0
    } else if fields.is_empty() {
        1.0
    } else {
        hits as f64 / fields.len() as f64
    };

    RewardOutputInfo {
        expected: true,
        passed: actual.is_some() && hits == fields.len(),
        parse_error,
        fields,
        score,
    }
}

/// Strings compare trimmed and case-insensitively, numbers numerically,
/// everything else structurally.
fn values_match(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::String(e), Value::String(a)) => e.trim().to_lowercase() == a.trim().to_lowercase(),
        (Value::Number(e), Value::Number(a)) => match (e.as_f64(), a.as_f64()) {
            (Some(e), Some(a)) => e == a,
            _ => e == a,
        },
        _ => expected == actual,
    }
}
