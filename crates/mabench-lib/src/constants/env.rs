//! Environment variable configuration for the harness
//!
//! Every setting has a default; a variable that is set but does not parse
//! falls back to that default.

use std::env;
use std::str::FromStr;

/// Default agent turn budget.
pub const DEFAULT_MAX_TURNS: u32 = 30;
/// Default timeout of one policy call, in seconds.
pub const DEFAULT_CALL_TIMEOUT_SECONDS: u64 = 120;
/// Default number of runs executed in parallel.
pub const DEFAULT_CONCURRENCY: usize = 4;
/// Default directory of task files.
pub const DEFAULT_TASKS_DIR: &str = "tasks/";

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| T::from_str(s.trim()).ok())
}

/// Run-loop configuration from environment variables
pub mod runs {
    use super::*;

    /// Get the agent turn budget
    pub fn max_turns() -> u32 {
        parsed("MABENCH_MAX_TURNS").unwrap_or(DEFAULT_MAX_TURNS)
    }

    /// Get the per policy call timeout in seconds
    pub fn call_timeout_seconds() -> u64 {
        parsed("MABENCH_CALL_TIMEOUT_SECONDS").unwrap_or(DEFAULT_CALL_TIMEOUT_SECONDS)
    }

    /// Get the wall-clock budget of a whole sweep, if any
    pub fn sweep_timeout_seconds() -> Option<u64> {
        parsed("MABENCH_SWEEP_TIMEOUT_SECONDS")
    }

    /// Get the number of runs executed in parallel
    pub fn concurrency() -> usize {
        parsed("MABENCH_CONCURRENCY").unwrap_or(DEFAULT_CONCURRENCY)
    }
}

/// Task source configuration from environment variables
pub mod tasks {
    use super::*;

    /// Get the directory task files are discovered in
    pub fn tasks_dir() -> String {
        env::var("MABENCH_TASKS_DIR").unwrap_or_else(|_| DEFAULT_TASKS_DIR.to_string())
    }
}
