use anyhow::{Context, Result};
use mabench_lib::{
    agent::{AgentPolicy, GroundTruthAgent, ScriptedUser, UserPolicy},
    airline::{self, AirlineDb},
    benchmark,
    task_env::Environment,
};
use mabench_types::{SolveResult, Task};
use std::{path::Path, sync::Arc};
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub mod config;
pub mod renderer;
pub mod solve;

pub use config::RunConfig;
pub use solve::{solve, SolveOptions};

/// The agent and user policies driving one run.
pub type Policies = (Box<dyn AgentPolicy>, Box<dyn UserPolicy>);

/// Creates fresh policies for every run of a sweep.
pub trait PolicyFactory: Send + Sync {
    fn policies(&self, task: &Task) -> Policies;
}

impl<F> PolicyFactory for F
where
    F: Fn(&Task) -> Policies + Send + Sync,
{
    fn policies(&self, task: &Task) -> Policies {
        self(task)
    }
}

/// Ground-truth replay against a user who only states the instruction.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroundTruthPolicies;

impl PolicyFactory for GroundTruthPolicies {
    fn policies(&self, task: &Task) -> Policies {
        (
            Box::new(GroundTruthAgent::new(task)),
            Box::new(ScriptedUser::default()),
        )
    }
}

/// Loads every task found at `path` and runs them.
pub async fn run_benchmarks(
    path: &Path,
    factory: Arc<dyn PolicyFactory>,
    config: &RunConfig,
    cancel: CancellationToken,
) -> Result<Vec<SolveResult>> {
    let tasks = benchmark::load_tasks(path)
        .with_context(|| format!("Failed to load tasks from {}", path.display()))?;
    if tasks.is_empty() {
        return Ok(vec![]);
    }
    run_tasks(tasks, factory, config, cancel).await
}

/// Runs `tasks` concurrently, each in its own environment, and returns one
/// result per task in input order.
///
/// Cancelling `cancel`, or reaching the sweep timeout, ends the runs still in
/// flight as `cancelled`; they are reported rather than dropped.
#[instrument(skip_all, fields(tasks = tasks.len(), concurrency = config.concurrency))]
pub async fn run_tasks(
    tasks: Vec<Task>,
    factory: Arc<dyn PolicyFactory>,
    config: &RunConfig,
    cancel: CancellationToken,
) -> Result<Vec<SolveResult>> {
    config.validate()?;
    let registry = Arc::new(airline::registry().context("Failed to build the airline registry")?);

    let sweep_cancel = cancel.child_token();
    // Raced against the runs in the join loop below.
    let deadline = tokio::time::sleep(config.sweep_timeout.unwrap_or_default());
    tokio::pin!(deadline);
    let mut deadline_armed = config.sweep_timeout.is_some();

    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let mut set = JoinSet::new();
    let total = tasks.len();

    for (index, task) in tasks.into_iter().enumerate() {
        let (mut agent, mut user) = factory.policies(&task);
        let env = Environment::new(
            airline::DOMAIN,
            AirlineDb::default(),
            registry.clone(),
            config.max_turns,
        );
        let options = SolveOptions {
            max_turns: config.max_turns,
            call_timeout: config.call_timeout,
            cancel: sweep_cancel.clone(),
        };
        let semaphore = semaphore.clone();

        set.spawn(async move {
            // A cancelled sweep skips the queue; the run then ends as cancelled.
            let _permit = tokio::select! {
                biased;
                _ = options.cancel.cancelled() => None,
                permit = semaphore.acquire_owned() => permit.ok(),
            };
            debug!(task_id = %task.id, index, "Starting run");
            let result = solve(env, &task, agent.as_mut(), user.as_mut(), &options).await;
            (index, result)
        });
    }

    let mut results = Vec::with_capacity(total);
    loop {
        tokio::select! {
            joined = set.join_next() => {
                let Some(joined) = joined else { break };
                let (index, result) = joined.context("Run task panicked")?;
                info!(
                    task_id = %result.task_id,
                    reward = result.reward.reward,
                    termination = %result.termination(),
                    "Task completed"
                );
                results.push((index, result));
            }
            () = &mut deadline, if deadline_armed => {
                deadline_armed = false;
                warn!(timeout = ?config.sweep_timeout, "Sweep deadline reached, cancelling remaining runs");
                sweep_cancel.cancel();
            }
        }
    }

    results.sort_by_key(|(index, _)| *index);
    Ok(results.into_iter().map(|(_, result)| result).collect())
}
