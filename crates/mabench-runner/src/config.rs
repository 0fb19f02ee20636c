use mabench_lib::constants::env::{self as env_config, runs, tasks};
use mabench_lib::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

/// Settings of a benchmark sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Agent turn budget of every run (tasks may override it).
    pub max_turns: u32,
    /// Timeout of a single agent or user policy call.
    pub call_timeout: Duration,
    /// Wall-clock budget of the whole sweep; `None` is unbounded.
    pub sweep_timeout: Option<Duration>,
    /// Runs executed in parallel.
    pub concurrency: usize,
    pub tasks_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_turns: env_config::DEFAULT_MAX_TURNS,
            call_timeout: Duration::from_secs(env_config::DEFAULT_CALL_TIMEOUT_SECONDS),
            sweep_timeout: None,
            concurrency: env_config::DEFAULT_CONCURRENCY,
            tasks_dir: PathBuf::from(env_config::DEFAULT_TASKS_DIR),
        }
    }
}

impl RunConfig {
    /// Read the configuration from `MABENCH_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            max_turns: runs::max_turns(),
            call_timeout: Duration::from_secs(runs::call_timeout_seconds()),
            sweep_timeout: runs::sweep_timeout_seconds().map(Duration::from_secs),
            concurrency: runs::concurrency(),
            tasks_dir: PathBuf::from(tasks::tasks_dir()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_turns == 0 {
            return Err(ConfigError::new("max_turns", "must be at least 1"));
        }
        if self.call_timeout.is_zero() {
            return Err(ConfigError::new("call_timeout", "must be positive"));
        }
        if self.sweep_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::new("sweep_timeout", "must be positive when set"));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::new("concurrency", "must be at least 1"));
        }
        Ok(())
    }
}
