use crate::{
    backend::StateStore,
    error::EnvError,
    task_env::environment::{Environment, Phase},
};
use mabench_types::{EnvInfo, EnvResetResponse, Task};
use tracing::info;

pub(crate) fn handle_reset<S: StateStore>(
    env: &mut Environment<S>,
    task: &Task,
) -> Result<EnvResetResponse, EnvError> {
    if env.phase != Phase::Created {
        return Err(EnvError::invalid_state(
            "reset may be called only once per environment",
        ));
    }
    if task.domain != env.domain {
        return Err(EnvError::DomainMismatch {
            expected: env.domain.clone(),
            found: task.domain.clone(),
        });
    }

    // 1. Load the seed. A failed load leaves the environment unusable but untouched.
    env.store.load(&task.initial_state)?;

    // 2. Fix the run metadata.
    let info = EnvInfo {
        task_id: task.id.clone(),
        domain: env.domain.clone(),
        user_id: task.user_id.clone(),
        max_turns: task.max_turns.unwrap_or(env.default_max_turns),
        tools: env.registry.names(),
    };
    info!(
        max_turns = info.max_turns,
        tools = info.tools.len(),
        "Environment reset"
    );

    env.info = Some(info.clone());
    env.phase = Phase::Running;

    let observation = format!(
        "You are serving a customer of the {} domain. Available operations: {}.",
        info.domain,
        info.tools.join(", ")
    );
    Ok(EnvResetResponse { observation, info })
}
