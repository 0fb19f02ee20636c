//! MA-Bench engine library
//!
//! This library implements the single-task execution and scoring engine:
//! - A closed, strongly-typed tool registry over a per-run state store
//! - A deterministic in-memory airline backend
//! - A Gymnasium-style environment with an explicit run lifecycle
//! - Structured response parsing for free-form final answers
//! - A pure reward engine with per-task comparison policies

pub mod agent;
pub mod airline;
pub mod backend;
pub mod benchmark;
pub mod constants;
pub mod env;
pub mod error;
pub mod parsing;
pub mod score;
pub mod task_env;

// Re-export main types for convenience
pub use agent::{
    AgentPolicy, AgentTurn, FinalResponse, GroundTruthAgent, Observation, ScriptedAgent,
    ScriptedUser, UserPolicy, UserTurn,
};
pub use backend::{StateStore, ToolKind, ToolRegistry, ToolSpec};
pub use env::GymEnv;
pub use error::{BackendError, BenchmarkError, ConfigError, DomainError, EnvError, ToolError};
pub use parsing::ResponseParser;
pub use score::RewardEngine;
pub use task_env::{Environment, Phase};
