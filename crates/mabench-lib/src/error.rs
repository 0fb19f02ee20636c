use mabench_types::TerminationReason;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by an [`Environment`](crate::task_env::Environment).
///
/// Every variant is fatal to the run it occurs in.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Operation attempted in the wrong lifecycle phase (reset twice, step after done).
    #[error("Invalid environment state: {0}")]
    InvalidState(String),

    /// The agent requested an operation the domain does not register.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The operation exists but its arguments do not decode.
    #[error("Malformed action '{name}': {reason}")]
    MalformedAction { name: String, reason: String },

    /// The task targets a different domain than the environment serves.
    #[error("Task domain '{found}' does not match environment domain '{expected}'")]
    DomainMismatch { expected: String, found: String },

    /// The backend could not be reset to the task's seed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl EnvError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// The termination reason a run ends with when this error occurs.
    pub fn termination_reason(&self) -> TerminationReason {
        match self {
            EnvError::UnknownAction(_) => TerminationReason::UnknownAction,
            EnvError::MalformedAction { .. } => TerminationReason::MalformedAction,
            EnvError::InvalidState(_)
            | EnvError::DomainMismatch { .. }
            | EnvError::Backend(_) => TerminationReason::InvalidState,
        }
    }
}

/// A recoverable, domain-level failure such as "flight not found".
///
/// Surfaced to the agent as an observation; the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DomainError(pub String);

impl DomainError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Failure to invoke a registered tool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    Unknown(String),

    #[error("Invalid arguments for '{name}': {reason}")]
    InvalidArguments { name: String, reason: String },

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Errors raised while building a tool registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Tool '{0}' is already registered")]
    Duplicate(String),

    #[error("Tool names must not be empty")]
    EmptyName,
}

/// Errors raised by a backend state store.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Errors raised while loading task files.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid task '{id}': {reason}")]
    InvalidTask { id: String, reason: String },

    #[error("Provided path is not a valid file or directory: {0}")]
    NotFound(PathBuf),
}

impl BenchmarkError {
    pub fn invalid_task(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTask {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Invalid harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Configuration error for {key}: {reason}")]
pub struct ConfigError {
    pub key: String,
    pub reason: String,
}

impl ConfigError {
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
