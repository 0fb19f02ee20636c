use crate::action::Action;
use crate::response::ResponseOutcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString, IntoStaticStr};

/// Static description of an environment instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvInfo {
    pub task_id: String,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Agent turn budget of the run.
    pub max_turns: u32,
    /// Operation names the agent may call.
    pub tools: Vec<String>,
}

/// The opening observation of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvResetResponse {
    pub observation: String,
    pub info: EnvInfo,
}

/// Who produced the text of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ObservationSource {
    Tool,
    User,
    Env,
}

/// The result of a single environment step or user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvResponse {
    pub observation: String,
    pub source: ObservationSource,
    /// Once true, the environment accepts no further actions.
    pub done: bool,
    pub info: EnvInfo,
}

/// What happened when an action was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The backend applied the operation.
    Applied { output: Value },
    /// The backend rejected it with a domain error; state is unchanged.
    Failed { error: String },
    /// The action never reached the backend (unknown or malformed).
    Rejected { error: String },
}

impl StepOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, StepOutcome::Applied { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            StepOutcome::Applied { .. } => None,
            StepOutcome::Failed { error } | StepOutcome::Rejected { error } => Some(error),
        }
    }
}

/// One entry of the action trajectory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryStep {
    pub action: Action,
    pub outcome: StepOutcome,
    /// Whether the operation writes backend state (false for reads and rejected actions).
    pub mutating: bool,
    /// The agent turn on which the action was taken (1-based).
    pub turn: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Agent,
    User,
    Tool,
}

/// A conversation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Why a run ended.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TerminationReason {
    /// The agent delivered its final response.
    AgentDone,
    /// The agent called an operation the domain marks as terminal.
    TerminalAction,
    /// The user simulator ended the conversation.
    UserStop,
    /// The agent turn budget was used up.
    MaxTurns,
    UnknownAction,
    MalformedAction,
    InvalidState,
    PolicyFailure,
    Timeout,
    Cancelled,
}

impl TerminationReason {
    /// Fatal reasons void the reward of the run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TerminationReason::UnknownAction
                | TerminationReason::MalformedAction
                | TerminationReason::InvalidState
                | TerminationReason::PolicyFailure
                | TerminationReason::Timeout
                | TerminationReason::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Immutable summary of one complete run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvRunResult {
    pub task_id: String,
    /// Final reward; 0.0 until the run is scored.
    pub reward: f64,
    pub trajectory: Vec<TrajectoryStep>,
    pub messages: Vec<Message>,
    pub response: ResponseOutcome,
    pub termination: TerminationReason,
    /// Diagnostic detail for fatal terminations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of agent turns taken.
    pub turns: u32,
}

impl EnvRunResult {
    /// Actions that were applied by the backend, in order.
    pub fn applied_actions(&self) -> impl Iterator<Item = &Action> {
        self.trajectory
            .iter()
            .filter(|step| step.outcome.is_applied())
            .map(|step| &step.action)
    }
}
