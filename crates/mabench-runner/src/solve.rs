//! # Solve Orchestrator
//!
//! Drives one task run end to end: reset, the user's opening line, then
//! strict alternation between agent turns and environment steps or user
//! replies until the environment reports `done`. Every policy call is
//! bounded by a timeout and races the sweep's cancellation token.
//!
//! Per-run failures never escape: timeouts, cancellation, policy errors and
//! fatal actions all end the run with an explicit termination reason and a
//! voided reward inside a well-formed [`SolveResult`].

use chrono::Utc;
use mabench_lib::{
    agent::{AgentPolicy, AgentTurn, FinalResponse, Observation, UserPolicy},
    backend::StateStore,
    constants::env as env_config,
    env::GymEnv,
    error::EnvError,
    parsing::ResponseParser,
    score::RewardEngine,
    task_env::Environment,
};
use mabench_types::{
    ParseFailureKind, ResponseOutcome, SolveMetadata, SolveResult, Task, TerminationReason,
};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Limits applied to a single run.
#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Hard cap on agent turns when the task does not set its own.
    pub max_turns: u32,
    /// Timeout of each agent or user policy call.
    pub call_timeout: Duration,
    pub cancel: CancellationToken,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_turns: env_config::DEFAULT_MAX_TURNS,
            call_timeout: Duration::from_secs(env_config::DEFAULT_CALL_TIMEOUT_SECONDS),
            cancel: CancellationToken::new(),
        }
    }
}

/// Why a run stopped early.
struct Abort {
    reason: TerminationReason,
    error: String,
}

impl Abort {
    fn new(reason: TerminationReason, error: impl Into<String>) -> Self {
        Self {
            reason,
            error: error.into(),
        }
    }
}

impl From<EnvError> for Abort {
    fn from(err: EnvError) -> Self {
        Self::new(err.termination_reason(), err.to_string())
    }
}

/// Await a policy call under the run's timeout and cancellation token.
async fn call_policy<T, F>(options: &SolveOptions, who: &str, call: F) -> Result<T, Abort>
where
    F: Future<Output = anyhow::Result<T>>,
{
    tokio::select! {
        biased;
        _ = options.cancel.cancelled() => Err(Abort::new(
            TerminationReason::Cancelled,
            format!("run cancelled while waiting for the {who}"),
        )),
        result = tokio::time::timeout(options.call_timeout, call) => match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(Abort::new(
                TerminationReason::PolicyFailure,
                format!("{who} policy failed: {err:#}"),
            )),
            Err(_) => Err(Abort::new(
                TerminationReason::Timeout,
                format!("{who} did not answer within {:?}", options.call_timeout),
            )),
        },
    }
}

/// Run `task` to completion in `env` and score it.
///
/// The environment is consumed: it serves exactly this one run.
#[instrument(skip_all, name = "solve", fields(task_id = %task.id))]
pub async fn solve<S: StateStore>(
    mut env: Environment<S>,
    task: &Task,
    agent: &mut dyn AgentPolicy,
    user: &mut dyn UserPolicy,
    options: &SolveOptions,
) -> SolveResult {
    let started_at = Utc::now();
    let clock = Instant::now();
    let engine = RewardEngine::for_registry(env.registry());

    if let Err(abort) = drive(&mut env, task, agent, user, options).await {
        env.abort(abort.reason, Some(abort.error));
    }
    if let Err(err) = env.close() {
        warn!(error = %err, "Failed to close environment");
    }

    let mut run = env.into_run_result();
    if run.task_id.is_empty() {
        run.task_id = task.id.clone();
    }
    let reward = engine.score_run(task, &run);
    run.reward = reward.reward;

    info!(
        termination = %run.termination,
        turns = run.turns,
        reward = reward.reward,
        "Run finished"
    );

    SolveResult {
        task_id: task.id.clone(),
        metadata: SolveMetadata {
            run_id: Uuid::new_v4(),
            agent: agent.name().to_string(),
            user: user.name().to_string(),
            turns: run.turns,
            cost: agent.cost(),
            duration_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
            started_at,
        },
        reward,
        run,
    }
}

/// The agent/user alternation. Returns early with the reason the run must
/// be aborted for.
async fn drive<S: StateStore>(
    env: &mut Environment<S>,
    task: &Task,
    agent: &mut dyn AgentPolicy,
    user: &mut dyn UserPolicy,
    options: &SolveOptions,
) -> Result<(), Abort> {
    let reset = env.reset(task)?;
    debug!(observation = %reset.observation, "Environment ready");
    let cap = task.max_turns.unwrap_or(options.max_turns);
    let schema = task.response_schema();
    let expects_output = schema.is_some();
    let parser = ResponseParser::new(schema.unwrap_or_default());

    let opening = call_policy(options, "user", user.start(&task.instruction)).await?;
    let mut observation: Observation = env.user_turn(opening)?.into();

    while !env.is_done() {
        if env.turns() >= cap {
            info!(turns = env.turns(), cap, "Hard turn cap reached");
            env.abort(TerminationReason::MaxTurns, None);
            break;
        }

        let turn = call_policy(options, "agent", agent.act(&observation)).await?;
        match turn {
            AgentTurn::Act(action) => {
                debug!(turn = env.turns() + 1, action = %action, "Agent action");
                observation = env.step(action)?.into();
            }
            AgentTurn::Respond(text) => {
                let relayed = env.agent_message(text.clone())?;
                if relayed.done {
                    break;
                }
                let reply = call_policy(options, "user", user.reply(&text)).await?;
                observation = env.user_turn(reply)?.into();
            }
            AgentTurn::Final(final_response) => {
                let (text, outcome) = match final_response {
                    FinalResponse::Structured(response) => {
                        let text = response.to_message();
                        let outcome: ResponseOutcome =
                            parser.validate(&response).map(|_| response).into();
                        (text, outcome)
                    }
                    FinalResponse::Text(text) => {
                        let outcome = match parser.parse(&text) {
                            Ok(response) => ResponseOutcome::Parsed(response),
                            // A plain closing message is fine when no answer is expected.
                            Err(failure)
                                if !expects_output
                                    && failure.kind == ParseFailureKind::NoPayload =>
                            {
                                ResponseOutcome::Missing
                            }
                            Err(failure) => ResponseOutcome::Failed(failure),
                        };
                        (text, outcome)
                    }
                };
                env.finish(text, outcome)?;
            }
        }
    }
    Ok(())
}
