//! MA-Bench: Multi-Agent Benchmark for airline customer service.
//!
//! Data contracts shared by the environment, the reward engine and the runner.
//! Adapted from τ-bench <https://arxiv.org/abs/2406.12045>.

pub mod action;
pub mod env;
pub mod response;
pub mod reward;
pub mod task;

pub use action::Action;
pub use env::{
    EnvInfo, EnvResetResponse, EnvResponse, EnvRunResult, Message, ObservationSource, Role,
    StepOutcome, TerminationReason, TrajectoryStep,
};
pub use response::{
    FieldKind, FieldSpec, ParseFailure, ParseFailureKind, ResponseOutcome, ResponseSchema,
    StructuredResponse, FINAL_RESPONSE_CLOSE, FINAL_RESPONSE_OPEN,
};
pub use reward::{
    FieldCheck, RewardActionInfo, RewardOutputInfo, RewardResult, SolveMetadata, SolveResult,
};
pub use task::{ActionMatch, ConflictPolicy, RewardCombination, RewardPolicy, Task};
