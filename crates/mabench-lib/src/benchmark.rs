//! Task file discovery, loading and validation.
//!
//! Tasks are authored as YAML files, one task per file. Loading validates
//! what serde cannot: unique ids, sane reward weights, a usable turn budget,
//! and an expected output that satisfies the task's own schema.

use crate::error::BenchmarkError;
use crate::parsing::ResponseParser;
use mabench_types::{RewardCombination, Task};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Collect the task files under `path`: the file itself, or every
/// `.yml`/`.yaml` file of a directory, sorted.
pub fn discover_tasks(path: &Path) -> Result<Vec<PathBuf>, BenchmarkError> {
    let mut task_paths = vec![];
    if path.is_dir() {
        let io_err = |source| BenchmarkError::Io {
            path: path.to_path_buf(),
            source,
        };
        for entry in fs::read_dir(path).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file()
                && (path.extension() == Some("yml".as_ref())
                    || path.extension() == Some("yaml".as_ref()))
            {
                task_paths.push(path);
            }
        }
    } else if path.is_file() {
        task_paths.push(path.to_path_buf());
    } else {
        return Err(BenchmarkError::NotFound(path.to_path_buf()));
    }

    if task_paths.is_empty() {
        info!(path = %path.display(), "No task files found.");
    }

    task_paths.sort();
    Ok(task_paths)
}

/// Read and validate a single task file.
pub fn load_task(path: &Path) -> Result<Task, BenchmarkError> {
    let content = fs::read_to_string(path).map_err(|source| BenchmarkError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let task: Task = serde_yaml::from_str(&content).map_err(|source| BenchmarkError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    validate_task(&task)?;
    Ok(task)
}

/// Load every task under `path`. Duplicate ids are rejected.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_tasks(path: &Path) -> Result<Vec<Task>, BenchmarkError> {
    let mut seen = HashSet::new();
    let mut tasks = Vec::new();
    for task_path in discover_tasks(path)? {
        let task = load_task(&task_path)?;
        if !seen.insert(task.id.clone()) {
            return Err(BenchmarkError::invalid_task(
                &task.id,
                format!("duplicate id in {}", task_path.display()),
            ));
        }
        tasks.push(task);
    }
    info!(count = tasks.len(), "Loaded tasks");
    Ok(tasks)
}

/// Checks a task beyond what deserialization guarantees.
pub fn validate_task(task: &Task) -> Result<(), BenchmarkError> {
    if task.id.trim().is_empty() {
        return Err(BenchmarkError::invalid_task(&task.id, "id must not be empty"));
    }
    if task.max_turns == Some(0) {
        return Err(BenchmarkError::invalid_task(
            &task.id,
            "max_turns must be at least 1",
        ));
    }
    if let Some(action) = task.actions.iter().find(|a| a.name.trim().is_empty()) {
        return Err(BenchmarkError::invalid_task(
            &task.id,
            format!("ground-truth action with empty name: {action}"),
        ));
    }
    if let RewardCombination::Weighted {
        action_weight,
        output_weight,
    } = task.policy.combination
    {
        let weights_ok = action_weight.is_finite()
            && output_weight.is_finite()
            && action_weight >= 0.0
            && output_weight >= 0.0
            && action_weight + output_weight > 0.0;
        if !weights_ok {
            return Err(BenchmarkError::invalid_task(
                &task.id,
                format!(
                    "weights must be non-negative with a positive sum \
                     (action_weight = {action_weight}, output_weight = {output_weight})"
                ),
            ));
        }
    }
    if let (Some(expected), Some(schema)) = (&task.expected_output, task.response_schema()) {
        ResponseParser::new(schema)
            .validate(expected)
            .map_err(|failure| {
                BenchmarkError::invalid_task(
                    &task.id,
                    format!("expected_output does not satisfy the output schema: {failure}"),
                )
            })?;
    }
    Ok(())
}
