use crate::{
    backend::{StateStore, ToolKind},
    error::{EnvError, ToolError},
    task_env::environment::{Environment, Phase},
};
use mabench_types::{
    Action, EnvResponse, Message, ObservationSource, Role, StepOutcome, TerminationReason,
    TrajectoryStep,
};
use serde_json::Value;
use tracing::{error, info, warn};

pub(crate) fn handle_step<S: StateStore>(
    env: &mut Environment<S>,
    action: Action,
) -> Result<EnvResponse, EnvError> {
    // Misuse of the lifecycle is rejected before anything is recorded.
    let info = env.ensure_running("step")?;
    env.turns += 1;
    let turn = env.turns;

    // 1. Registry lookup. Unknown names never reach the store.
    let Some(kind) = env.registry.spec(&action.name).map(|spec| spec.kind) else {
        let err = EnvError::UnknownAction(action.name.clone());
        return Err(reject(env, action, turn, err));
    };

    // 2. Decode and apply.
    let result = env.registry.invoke(&mut env.store, &action);
    let observation = match result {
        Ok(output) => {
            info!(turn, action = %action.name, "Action applied");
            let observation = render_output(&output);
            env.trajectory.push(TrajectoryStep {
                action,
                outcome: StepOutcome::Applied { output },
                mutating: kind.is_mutating(),
                turn,
            });
            if kind == ToolKind::Terminal {
                env.phase = Phase::Done(TerminationReason::TerminalAction);
            }
            observation
        }
        Err(ToolError::Domain(domain)) => {
            warn!(turn, action = %action.name, error = %domain, "Action failed");
            env.trajectory.push(TrajectoryStep {
                action,
                outcome: StepOutcome::Failed {
                    error: domain.to_string(),
                },
                mutating: false,
                turn,
            });
            format!("Error: {domain}")
        }
        Err(ToolError::InvalidArguments { name, reason }) => {
            let err = EnvError::MalformedAction { name, reason };
            return Err(reject(env, action, turn, err));
        }
        Err(ToolError::Unknown(name)) => {
            return Err(reject(env, action, turn, EnvError::UnknownAction(name)));
        }
    };

    env.messages.push(Message::new(Role::Tool, observation.clone()));
    env.end_agent_turn();
    Ok(env.response(observation, ObservationSource::Tool, info))
}

/// Record an action that never reached the store and end the run with the
/// error's termination reason.
fn reject<S: StateStore>(
    env: &mut Environment<S>,
    action: Action,
    turn: u32,
    err: EnvError,
) -> EnvError {
    let reason = err.termination_reason();
    error!(turn, action = %action.name, %reason, "Action rejected: {err}");
    env.trajectory.push(TrajectoryStep {
        action,
        outcome: StepOutcome::Rejected {
            error: err.to_string(),
        },
        mutating: false,
        turn,
    });
    env.phase = Phase::Done(reason);
    env.error = Some(err.to_string());
    err
}

/// Tool output as the text the agent sees.
fn render_output(output: &Value) -> String {
    match output {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
