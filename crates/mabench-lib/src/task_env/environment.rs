use crate::{
    agent::UserTurn,
    backend::{StateStore, ToolRegistry},
    env::GymEnv,
    error::EnvError,
    task_env::{reset, step},
};
use mabench_types::{
    Action, EnvInfo, EnvResetResponse, EnvResponse, EnvRunResult, Message, ObservationSource,
    ResponseOutcome, Role, Task, TerminationReason, TrajectoryStep,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle phase of an [`Environment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Running,
    Done(TerminationReason),
}

/// The environment of a single task run.
///
/// Owns its state store exclusively; the registry is shared read-only between
/// environments of the same domain.
pub struct Environment<S: StateStore> {
    pub(crate) domain: String,
    pub(crate) store: S,
    pub(crate) registry: Arc<ToolRegistry<S>>,
    /// Turn budget used when the task does not override it.
    pub(crate) default_max_turns: u32,
    pub(crate) phase: Phase,
    pub(crate) info: Option<EnvInfo>,
    pub(crate) turns: u32,
    pub(crate) trajectory: Vec<TrajectoryStep>,
    pub(crate) messages: Vec<Message>,
    pub(crate) response: ResponseOutcome,
    pub(crate) error: Option<String>,
}

impl<S: StateStore> Environment<S> {
    pub fn new(
        domain: impl Into<String>,
        store: S,
        registry: Arc<ToolRegistry<S>>,
        max_turns: u32,
    ) -> Self {
        Self {
            domain: domain.into(),
            store,
            registry,
            default_max_turns: max_turns,
            phase: Phase::Created,
            info: None,
            turns: 0,
            trajectory: Vec::new(),
            messages: Vec::new(),
            response: ResponseOutcome::Missing,
            error: None,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        matches!(self.phase, Phase::Done(_))
    }

    pub fn termination(&self) -> Option<TerminationReason> {
        match self.phase {
            Phase::Done(reason) => Some(reason),
            _ => None,
        }
    }

    /// Environment metadata; `None` before `reset`.
    pub fn info(&self) -> Option<&EnvInfo> {
        self.info.as_ref()
    }

    /// Agent turns taken so far.
    pub fn turns(&self) -> u32 {
        self.turns
    }

    pub fn trajectory(&self) -> &[TrajectoryStep] {
        &self.trajectory
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn registry(&self) -> &ToolRegistry<S> {
        &self.registry
    }

    /// Read access to the domain state, for inspection and tests.
    pub fn state(&self) -> &S {
        &self.store
    }

    /// Relay a free-form agent message to the user. Counts one agent turn.
    pub fn agent_message(&mut self, text: impl Into<String>) -> Result<EnvResponse, EnvError> {
        let info = self.ensure_running("agent_message")?;
        let text = text.into();
        self.turns += 1;
        debug!(turn = self.turns, "Agent message");
        self.messages.push(Message::new(Role::Agent, text.clone()));
        self.end_agent_turn();
        Ok(self.response(text, ObservationSource::Env, info))
    }

    /// Record the user simulator's turn.
    pub fn user_turn(&mut self, turn: UserTurn) -> Result<EnvResponse, EnvError> {
        let info = self.ensure_running("user_turn")?;
        match turn {
            UserTurn::Say(text) => {
                self.messages.push(Message::new(Role::User, text.clone()));
                Ok(self.response(text, ObservationSource::User, info))
            }
            UserTurn::Stop => {
                info!(turn = self.turns, "User ended the conversation");
                self.phase = Phase::Done(TerminationReason::UserStop);
                Ok(self.response(
                    "The user ended the conversation.".to_string(),
                    ObservationSource::Env,
                    info,
                ))
            }
        }
    }

    /// Record the agent's final answer and end the run. Counts one agent turn.
    pub fn finish(
        &mut self,
        text: impl Into<String>,
        outcome: ResponseOutcome,
    ) -> Result<EnvResponse, EnvError> {
        let info = self.ensure_running("finish")?;
        let text = text.into();
        self.turns += 1;
        if let ResponseOutcome::Failed(failure) = &outcome {
            warn!(turn = self.turns, %failure, "Final response did not parse");
        }
        self.messages.push(Message::new(Role::Agent, text.clone()));
        self.response = outcome;
        self.phase = Phase::Done(TerminationReason::AgentDone);
        info!(turn = self.turns, "Agent delivered its final response");
        Ok(self.response(text, ObservationSource::Env, info))
    }

    /// End the run from outside, e.g. on timeout or cancellation.
    ///
    /// A run that already ended keeps its original termination reason.
    pub fn abort(&mut self, reason: TerminationReason, error: Option<String>) {
        if let Phase::Done(existing) = self.phase {
            debug!(%existing, requested = %reason, "Abort ignored: run already ended");
            return;
        }
        warn!(%reason, error = error.as_deref().unwrap_or(""), "Run aborted");
        self.phase = Phase::Done(reason);
        self.error = error;
    }

    /// Summary of the finished run. The reward stays 0.0 until it is scored.
    pub fn run_result(&self) -> Result<EnvRunResult, EnvError> {
        let Phase::Done(termination) = self.phase else {
            return Err(EnvError::invalid_state(
                "run_result requested before the run ended",
            ));
        };
        Ok(self.build_run_result(termination))
    }

    /// Tear the environment down and return its run summary. A run that has
    /// not reached a terminal condition ends as `invalid_state`.
    pub fn into_run_result(mut self) -> EnvRunResult {
        if !self.is_done() {
            self.abort(
                TerminationReason::InvalidState,
                Some("run ended without a terminal condition".to_string()),
            );
        }
        let termination = self.termination().unwrap_or(TerminationReason::InvalidState);
        self.build_run_result(termination)
    }

    fn build_run_result(&self, termination: TerminationReason) -> EnvRunResult {
        EnvRunResult {
            task_id: self
                .info
                .as_ref()
                .map(|info| info.task_id.clone())
                .unwrap_or_default(),
            reward: 0.0,
            trajectory: self.trajectory.clone(),
            messages: self.messages.clone(),
            response: self.response.clone(),
            termination,
            error: self.error.clone(),
            turns: self.turns,
        }
    }

    /// Fail unless the run is in progress; returns the current metadata.
    pub(crate) fn ensure_running(&self, operation: &str) -> Result<EnvInfo, EnvError> {
        match (&self.phase, &self.info) {
            (Phase::Running, Some(info)) => Ok(info.clone()),
            (Phase::Done(reason), _) => Err(EnvError::invalid_state(format!(
                "{operation} called after the run ended ({reason})"
            ))),
            _ => Err(EnvError::invalid_state(format!(
                "{operation} called before reset"
            ))),
        }
    }

    /// Apply the turn budget after an agent turn.
    pub(crate) fn end_agent_turn(&mut self) {
        let budget = self.info.as_ref().map(|info| info.max_turns);
        if let (Phase::Running, Some(budget)) = (self.phase, budget) {
            if self.turns >= budget {
                info!(turns = self.turns, "Turn budget exhausted");
                self.phase = Phase::Done(TerminationReason::MaxTurns);
            }
        }
    }

    pub(crate) fn response(
        &self,
        observation: String,
        source: ObservationSource,
        info: EnvInfo,
    ) -> EnvResponse {
        EnvResponse {
            observation,
            source,
            done: self.is_done(),
            info,
        }
    }
}

impl<S: StateStore> GymEnv for Environment<S> {
    type Action = Action;
    type Task = Task;

    #[tracing::instrument(skip_all, name = "env.reset", fields(task_id = %task.id))]
    fn reset(&mut self, task: &Task) -> Result<EnvResetResponse, EnvError> {
        reset::handle_reset(self, task)
    }

    #[tracing::instrument(skip_all, name = "env.step", fields(action = %action.name))]
    fn step(&mut self, action: Action) -> Result<EnvResponse, EnvError> {
        step::handle_step(self, action)
    }

    fn render(&self) {
        debug!("--- Environment State ---");
        debug!(phase = ?self.phase, turns = self.turns, "Lifecycle");
        for step in &self.trajectory {
            debug!(turn = step.turn, action = %step.action, outcome = ?step.outcome, "Trajectory");
        }
        debug!(state = %self.store.snapshot(), "Domain state");
        debug!("-------------------------");
    }

    fn close(&mut self) -> Result<(), EnvError> {
        if self.phase == Phase::Running {
            self.abort(
                TerminationReason::Cancelled,
                Some("environment closed while the run was in progress".to_string()),
            );
        }
        info!("Environment closed.");
        Ok(())
    }
}
