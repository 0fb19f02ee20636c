//! Tests for environment variable configuration

use mabench_lib::constants::env::{runs, tasks};
use serial_test::serial;
use std::env;

#[test]
#[serial]
fn test_default_values() {
    env::remove_var("MABENCH_MAX_TURNS");
    env::remove_var("MABENCH_CALL_TIMEOUT_SECONDS");
    env::remove_var("MABENCH_SWEEP_TIMEOUT_SECONDS");
    env::remove_var("MABENCH_CONCURRENCY");
    env::remove_var("MABENCH_TASKS_DIR");

    assert_eq!(runs::max_turns(), 30);
    assert_eq!(runs::call_timeout_seconds(), 120);
    assert_eq!(runs::sweep_timeout_seconds(), None);
    assert_eq!(runs::concurrency(), 4);
    assert_eq!(tasks::tasks_dir(), "tasks/");
}

#[test]
#[serial]
fn test_env_override() {
    env::set_var("MABENCH_MAX_TURNS", "12");
    env::set_var("MABENCH_SWEEP_TIMEOUT_SECONDS", "600");
    assert_eq!(runs::max_turns(), 12);
    assert_eq!(runs::sweep_timeout_seconds(), Some(600));
    env::remove_var("MABENCH_MAX_TURNS");
    env::remove_var("MABENCH_SWEEP_TIMEOUT_SECONDS");
}

#[test]
#[serial]
fn test_invalid_values() {
    // Unparseable values fall back to the defaults
    env::set_var("MABENCH_CONCURRENCY", "many");
    env::set_var("MABENCH_CALL_TIMEOUT_SECONDS", "-5");
    assert_eq!(runs::concurrency(), 4);
    assert_eq!(runs::call_timeout_seconds(), 120);
    env::remove_var("MABENCH_CONCURRENCY");
    env::remove_var("MABENCH_CALL_TIMEOUT_SECONDS");
}
