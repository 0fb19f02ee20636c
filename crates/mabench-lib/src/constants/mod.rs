//! Constants module for centralized configuration values

pub mod env;

pub use env::{
    runs::{call_timeout_seconds, concurrency, max_turns, sweep_timeout_seconds},
    tasks::tasks_dir,
};
