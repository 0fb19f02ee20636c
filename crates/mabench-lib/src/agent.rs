//! Agent and user-simulator policy interfaces, plus the deterministic
//! policies the harness uses to run and test itself.
//!
//! Model-backed policies live outside this crate; they only have to
//! implement [`AgentPolicy`] or [`UserPolicy`].

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use mabench_types::{
    Action, EnvInfo, EnvResetResponse, EnvResponse, ObservationSource, StructuredResponse, Task,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, instrument};

/// What the agent sees before each of its turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub text: String,
    pub source: ObservationSource,
    pub info: EnvInfo,
}

impl From<EnvResponse> for Observation {
    fn from(response: EnvResponse) -> Self {
        Self {
            text: response.observation,
            source: response.source,
            info: response.info,
        }
    }
}

impl From<EnvResetResponse> for Observation {
    fn from(response: EnvResetResponse) -> Self {
        Self {
            text: response.observation,
            source: ObservationSource::Env,
            info: response.info,
        }
    }
}

/// The agent's final answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FinalResponse {
    /// Already structured; no parsing needed.
    Structured(StructuredResponse),
    /// Free text; goes through the response parser.
    Text(String),
}

/// The result of one agent turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AgentTurn {
    /// Call a domain operation.
    Act(Action),
    /// Say something to the user.
    Respond(String),
    /// Deliver the final answer and end the run.
    Final(FinalResponse),
}

/// The result of one user-simulator turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum UserTurn {
    Say(String),
    /// End the conversation.
    Stop,
}

/// A customer-service agent.
///
/// Called once per agent turn with the latest observation. An `Err` is an
/// unrecoverable policy failure and ends the run.
#[async_trait]
pub trait AgentPolicy: Send {
    fn name(&self) -> &str;

    async fn act(&mut self, observation: &Observation) -> Result<AgentTurn>;

    /// Accumulated model cost, if the policy tracks one.
    fn cost(&self) -> Option<f64> {
        None
    }
}

/// A simulated customer.
#[async_trait]
pub trait UserPolicy: Send {
    fn name(&self) -> &str;

    /// Open the conversation from the task's hidden instruction.
    async fn start(&mut self, instruction: &str) -> Result<UserTurn>;

    /// React to an agent message.
    async fn reply(&mut self, message: &str) -> Result<UserTurn>;
}

/// Replays a task's ground-truth actions, then delivers its expected output.
///
/// Scores 1.0 on any well-formed task, which makes it the reference policy
/// for validating task files.
#[derive(Debug, Clone)]
pub struct GroundTruthAgent {
    actions: VecDeque<Action>,
    expected: Option<StructuredResponse>,
}

impl GroundTruthAgent {
    pub fn new(task: &Task) -> Self {
        Self {
            actions: task.actions.iter().cloned().collect(),
            expected: task.expected_output.clone(),
        }
    }
}

#[async_trait]
impl AgentPolicy for GroundTruthAgent {
    fn name(&self) -> &str {
        "ground-truth"
    }

    #[instrument(skip_all, name = "agent.ground_truth.act")]
    async fn act(&mut self, _observation: &Observation) -> Result<AgentTurn> {
        if let Some(action) = self.actions.pop_front() {
            debug!(action = %action, "Replaying ground-truth action");
            return Ok(AgentTurn::Act(action));
        }
        Ok(AgentTurn::Final(match self.expected.take() {
            Some(expected) => FinalResponse::Structured(expected),
            None => FinalResponse::Text("Your request has been handled.".to_string()),
        }))
    }
}

/// Replays a fixed list of turns. Running out of turns is a policy failure.
#[derive(Debug, Clone)]
pub struct ScriptedAgent {
    name: String,
    turns: VecDeque<AgentTurn>,
}

impl ScriptedAgent {
    pub fn new(turns: impl IntoIterator<Item = AgentTurn>) -> Self {
        Self {
            name: "scripted".to_string(),
            turns: turns.into_iter().collect(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl AgentPolicy for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn act(&mut self, _observation: &Observation) -> Result<AgentTurn> {
        self.turns
            .pop_front()
            .ok_or_else(|| anyhow!("agent script exhausted"))
    }
}

/// Opens with the task instruction, answers with scripted utterances, then
/// stops.
#[derive(Debug, Clone, Default)]
pub struct ScriptedUser {
    utterances: VecDeque<String>,
}

impl ScriptedUser {
    pub fn new<I, T>(utterances: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            utterances: utterances.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl UserPolicy for ScriptedUser {
    fn name(&self) -> &str {
        "scripted-user"
    }

    async fn start(&mut self, instruction: &str) -> Result<UserTurn> {
        Ok(UserTurn::Say(instruction.to_string()))
    }

    async fn reply(&mut self, _message: &str) -> Result<UserTurn> {
        Ok(self
            .utterances
            .pop_front()
            .map(UserTurn::Say)
            .unwrap_or(UserTurn::Stop))
    }
}
