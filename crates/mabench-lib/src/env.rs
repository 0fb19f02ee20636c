//! # Environment Interface for Agent Evaluation
//!
//! The environment mediates every interaction between an agent and the
//! simulated domain state of one task run. The interface follows the
//! Gymnasium pattern (`reset`, `step`, `render`, `close`), narrowed to the
//! needs of a conversational benchmark:
//!
//! - **Deterministic state**: `reset` loads the task's seed snapshot into a
//!   store the environment owns exclusively.
//! - **Closed action space**: `step` only dispatches operations present in
//!   the domain registry; anything else ends the run before touching state.
//! - **Explicit lifecycle**: once a response reports `done`, every further
//!   `step` fails with an invalid-state error.
//!
//! The concrete implementation lives in [`crate::task_env`].

use crate::error::EnvError;
use mabench_types::{EnvResetResponse, EnvResponse};

/// Gymnasium-style interface of a single-run environment.
///
/// Implementations are single-writer: every method takes `&mut self`, so one
/// instance can never be stepped concurrently. Independent instances share
/// nothing and may run in parallel.
pub trait GymEnv {
    /// The unit of interaction submitted by the agent.
    type Action;

    /// The task description the environment is initialized from.
    type Task;

    /// Initialize the domain state from `task` and return the opening
    /// observation.
    ///
    /// May be called exactly once per instance. A second call fails with
    /// [`EnvError::InvalidState`].
    fn reset(&mut self, task: &Self::Task) -> Result<EnvResetResponse, EnvError>;

    /// Apply one agent action.
    ///
    /// Domain failures are returned as ordinary observations. Unknown or
    /// malformed actions, and any call made before `reset` or after `done`,
    /// are errors.
    fn step(&mut self, action: Self::Action) -> Result<EnvResponse, EnvError>;

    /// Log a human-readable view of the current state.
    fn render(&self);

    /// Release the run's resources. A run still in progress is cancelled.
    fn close(&mut self) -> Result<(), EnvError>;
}
