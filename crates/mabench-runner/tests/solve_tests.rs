//! # Solve Orchestrator Tests
//!
//! Each test drives a full run through `solve` with scripted or ground-truth
//! policies and checks the terminal `SolveResult`: termination reason, turn
//! count, reward and the voiding of fatal runs.

mod common;

use mabench_lib::agent::{
    AgentTurn, FinalResponse, GroundTruthAgent, ScriptedAgent, ScriptedUser,
};
use mabench_runner::{solve, SolveOptions};
use mabench_types::{Action, ResponseOutcome, StepOutcome, Task, TerminationReason};
use rstest::rstest;
use serde_json::json;
use std::time::Duration;

use common::{book_ab100, booking_task, confirmed, think, SlowAgent};

fn options() -> SolveOptions {
    SolveOptions {
        max_turns: 10,
        ..SolveOptions::default()
    }
}

#[tokio::test]
async fn test_ground_truth_agent_scores_full_reward() {
    common::init_tracing();
    let task = booking_task("airline-book-001");
    let mut agent = GroundTruthAgent::new(&task);
    let mut user = ScriptedUser::default();

    let result = solve(common::env(10), &task, &mut agent, &mut user, &options()).await;

    assert_eq!(result.task_id, "airline-book-001");
    assert_eq!(result.termination(), TerminationReason::AgentDone);
    assert_eq!(result.reward.reward, 1.0);
    assert!(result.succeeded());
    assert_eq!(result.run.reward, 1.0);
    assert_eq!(result.run.turns, 2);
    assert_eq!(result.metadata.turns, 2);
    assert_eq!(result.metadata.agent, "ground-truth");
    assert_eq!(result.metadata.user, "scripted-user");
    assert!(result.reward.voided_by.is_none());
    assert!(matches!(result.run.response, ResponseOutcome::Parsed(_)));
}

#[tokio::test]
async fn test_omitting_the_booking_scores_zero() {
    let task = booking_task("airline-book-001");
    let mut agent = ScriptedAgent::new([AgentTurn::Final(FinalResponse::Structured(confirmed()))]);
    let mut user = ScriptedUser::default();

    let result = solve(common::env(10), &task, &mut agent, &mut user, &options()).await;

    assert_eq!(result.termination(), TerminationReason::AgentDone);
    assert_eq!(result.reward.reward, 0.0);
    assert!(result.reward.voided_by.is_none());
    assert_eq!(result.reward.actions.missing, vec![book_ab100()]);
    assert!(result.reward.output.passed);
}

#[tokio::test]
async fn test_unknown_action_voids_the_run() {
    common::init_tracing();
    let task = booking_task("airline-book-001");
    let mut agent = ScriptedAgent::new([
        AgentTurn::Act(book_ab100()),
        AgentTurn::Act(Action::new("delete_universe", json!({}))),
        AgentTurn::Final(FinalResponse::Structured(confirmed())),
    ]);
    let mut user = ScriptedUser::default();

    let result = solve(common::env(10), &task, &mut agent, &mut user, &options()).await;

    assert_eq!(result.termination(), TerminationReason::UnknownAction);
    assert_eq!(result.termination().as_str(), "unknown_action");
    assert_eq!(result.reward.reward, 0.0);
    assert_eq!(result.reward.voided_by, Some(TerminationReason::UnknownAction));
    assert_eq!(result.run.turns, 2);
    let last = result.run.trajectory.last().expect("rejected step recorded");
    assert!(matches!(last.outcome, StepOutcome::Rejected { .. }));
    assert!(result.run.error.is_some());
}

#[tokio::test]
async fn test_malformed_arguments_void_the_run() {
    let task = booking_task("airline-book-001");
    let mut agent = ScriptedAgent::new([AgentTurn::Act(Action::new(
        "book_flight",
        json!({ "passenger_id": "one" }),
    ))]);
    let mut user = ScriptedUser::default();

    let result = solve(common::env(10), &task, &mut agent, &mut user, &options()).await;

    assert_eq!(result.termination(), TerminationReason::MalformedAction);
    assert_eq!(result.reward.voided_by, Some(TerminationReason::MalformedAction));
}

#[tokio::test]
async fn test_domain_error_is_observed_and_the_run_continues() {
    let task = booking_task("airline-book-001");
    let mut agent = ScriptedAgent::new([
        AgentTurn::Act(Action::new(
            "book_flight",
            json!({ "passenger_id": 1, "flight": "ZZ999" }),
        )),
        AgentTurn::Act(book_ab100()),
        AgentTurn::Final(FinalResponse::Structured(confirmed())),
    ]);
    let mut user = ScriptedUser::default();

    let result = solve(common::env(10), &task, &mut agent, &mut user, &options()).await;

    assert_eq!(result.termination(), TerminationReason::AgentDone);
    assert!(matches!(
        result.run.trajectory[0].outcome,
        StepOutcome::Failed { .. }
    ));
    assert_eq!(result.reward.reward, 1.0);
}

#[rstest]
#[case(1)]
#[case(3)]
#[tokio::test]
async fn test_turn_budget_ends_the_run(#[case] budget: u32) {
    let mut task = booking_task("airline-book-001");
    task.max_turns = Some(budget);
    let mut agent = ScriptedAgent::new(std::iter::repeat_with(|| AgentTurn::Act(think())).take(10));
    let mut user = ScriptedUser::default();

    let result = solve(common::env(30), &task, &mut agent, &mut user, &options()).await;

    assert_eq!(result.termination(), TerminationReason::MaxTurns);
    assert_eq!(result.run.turns, budget);
    assert_eq!(result.run.trajectory.len(), budget as usize);
    assert!(result.reward.voided_by.is_none());
    assert_eq!(result.reward.reward, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_agent_times_out() {
    let task = booking_task("airline-book-001");
    let mut agent = SlowAgent {
        delay: Duration::from_secs(3600),
    };
    let mut user = ScriptedUser::default();
    let options = SolveOptions {
        call_timeout: Duration::from_secs(1),
        ..options()
    };

    let result = solve(common::env(10), &task, &mut agent, &mut user, &options).await;

    assert_eq!(result.termination(), TerminationReason::Timeout);
    assert_eq!(result.reward.reward, 0.0);
    assert_eq!(result.reward.voided_by, Some(TerminationReason::Timeout));
    assert_eq!(result.metadata.agent, "slow");
}

#[tokio::test]
async fn test_cancelled_run_is_reported() {
    let task = booking_task("airline-book-001");
    let mut agent = GroundTruthAgent::new(&task);
    let mut user = ScriptedUser::default();
    let options = options();
    options.cancel.cancel();

    let result = solve(common::env(10), &task, &mut agent, &mut user, &options).await;

    assert_eq!(result.termination(), TerminationReason::Cancelled);
    assert_eq!(result.run.turns, 0);
    assert_eq!(result.reward.reward, 0.0);
    assert_eq!(result.reward.voided_by, Some(TerminationReason::Cancelled));
}

#[tokio::test]
async fn test_exhausted_script_is_a_policy_failure() {
    let task = booking_task("airline-book-001");
    let mut agent = ScriptedAgent::new([AgentTurn::Act(book_ab100())]);
    let mut user = ScriptedUser::default();

    let result = solve(common::env(10), &task, &mut agent, &mut user, &options()).await;

    assert_eq!(result.termination(), TerminationReason::PolicyFailure);
    assert_eq!(result.reward.voided_by, Some(TerminationReason::PolicyFailure));
    let error = result.run.error.expect("policy error recorded");
    assert!(error.contains("agent script exhausted"), "{error}");
}

#[rstest]
#[case::tagged("All set. <final_response>{\"status\": \"Confirmed\"}</final_response>")]
#[case::fenced("Booked!\n```json\n{\"status\": \"confirmed\"}\n```")]
#[tokio::test]
async fn test_free_text_final_response_is_parsed(#[case] text: &str) {
    let task = booking_task("airline-book-001");
    let mut agent = ScriptedAgent::new([
        AgentTurn::Act(book_ab100()),
        AgentTurn::Final(FinalResponse::Text(text.to_string())),
    ]);
    let mut user = ScriptedUser::default();

    let result = solve(common::env(10), &task, &mut agent, &mut user, &options()).await;

    assert!(matches!(result.run.response, ResponseOutcome::Parsed(_)));
    assert_eq!(result.reward.reward, 1.0);
}

#[tokio::test]
async fn test_unparseable_final_response_fails_the_output_check() {
    let task = booking_task("airline-book-001");
    let mut agent = ScriptedAgent::new([
        AgentTurn::Act(book_ab100()),
        AgentTurn::Final(FinalResponse::Text("Your flight is booked.".to_string())),
    ]);
    let mut user = ScriptedUser::default();

    let result = solve(common::env(10), &task, &mut agent, &mut user, &options()).await;

    assert_eq!(result.termination(), TerminationReason::AgentDone);
    assert!(matches!(result.run.response, ResponseOutcome::Failed(_)));
    assert!(result.reward.output.parse_error.is_some());
    assert!(result.reward.actions.passed);
    assert_eq!(result.reward.reward, 0.0);
}

#[tokio::test]
async fn test_user_stop_ends_the_conversation() {
    let mut task = Task::new("airline-chat-001", "Ask whether pets are allowed, then leave.");
    task.initial_state = common::seed();
    let mut agent = ScriptedAgent::new([AgentTurn::Respond(
        "Small pets are allowed in the cabin.".to_string(),
    )]);
    let mut user = ScriptedUser::default();

    let result = solve(common::env(10), &task, &mut agent, &mut user, &options()).await;

    assert_eq!(result.termination(), TerminationReason::UserStop);
    assert_eq!(result.run.turns, 1);
    assert_eq!(result.run.messages.len(), 2);
    assert_eq!(result.reward.reward, 1.0);
}

#[tokio::test]
async fn test_conversation_alternates_with_the_user() {
    let task = booking_task("airline-book-001");
    let mut agent = ScriptedAgent::new([
        AgentTurn::Respond("Which flight would you like?".to_string()),
        AgentTurn::Act(book_ab100()),
        AgentTurn::Final(FinalResponse::Structured(confirmed())),
    ]);
    let mut user = ScriptedUser::new(["AB100 please."]);

    let result = solve(common::env(10), &task, &mut agent, &mut user, &options()).await;

    assert_eq!(result.termination(), TerminationReason::AgentDone);
    assert_eq!(result.run.turns, 3);
    assert_eq!(result.reward.reward, 1.0);
    let users: Vec<&str> = result
        .run
        .messages
        .iter()
        .filter(|m| m.role == mabench_types::Role::User)
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(users, vec![task.instruction.as_str(), "AB100 please."]);
}

#[tokio::test]
async fn test_transfer_ends_the_run_as_terminal_action() {
    let mut task = Task::new("airline-transfer-001", "Demand to speak to a human.");
    task.initial_state = common::seed();
    let transfer = Action::new(
        "transfer_to_human_agents",
        json!({ "summary": "Customer asked for a human." }),
    );
    task.actions = vec![transfer.clone()];
    let mut agent = ScriptedAgent::new([AgentTurn::Act(transfer)]);
    let mut user = ScriptedUser::default();

    let result = solve(common::env(10), &task, &mut agent, &mut user, &options()).await;

    assert_eq!(result.termination(), TerminationReason::TerminalAction);
    assert_eq!(result.reward.reward, 1.0);
}

#[tokio::test]
async fn test_wrong_domain_ends_as_invalid_state() {
    let mut task = booking_task("retail-001");
    task.domain = "retail".to_string();
    let mut agent = GroundTruthAgent::new(&task);
    let mut user = ScriptedUser::default();

    let result = solve(common::env(10), &task, &mut agent, &mut user, &options()).await;

    assert_eq!(result.task_id, "retail-001");
    assert_eq!(result.run.task_id, "retail-001");
    assert_eq!(result.termination(), TerminationReason::InvalidState);
    assert_eq!(result.reward.voided_by, Some(TerminationReason::InvalidState));
}
