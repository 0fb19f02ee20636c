//! Tests for the deterministic policies

mod common;

use mabench_lib::agent::{
    AgentPolicy, AgentTurn, FinalResponse, GroundTruthAgent, Observation, ScriptedAgent,
    ScriptedUser, UserPolicy, UserTurn,
};
use mabench_lib::env::GymEnv;

fn observation() -> Observation {
    let mut env = common::env(10);
    env.reset(&common::booking_task()).unwrap().into()
}

#[tokio::test]
async fn test_ground_truth_agent_replays_then_answers() {
    let task = common::booking_task();
    let mut agent = GroundTruthAgent::new(&task);
    let obs = observation();

    assert_eq!(
        agent.act(&obs).await.unwrap(),
        AgentTurn::Act(common::book_ab100())
    );
    assert_eq!(
        agent.act(&obs).await.unwrap(),
        AgentTurn::Final(FinalResponse::Structured(common::confirmed()))
    );
    assert_eq!(agent.name(), "ground-truth");
    assert_eq!(agent.cost(), None);
}

#[tokio::test]
async fn test_scripted_agent_fails_when_exhausted() {
    let mut agent = ScriptedAgent::new([AgentTurn::Respond("Hello!".to_string())]);
    let obs = observation();
    assert!(matches!(
        agent.act(&obs).await.unwrap(),
        AgentTurn::Respond(_)
    ));
    let err = agent.act(&obs).await.unwrap_err();
    assert!(err.to_string().contains("exhausted"));
}

#[tokio::test]
async fn test_scripted_user_opens_with_instruction() {
    let mut user = ScriptedUser::new(["Yes, please."]);
    assert_eq!(
        user.start("Book AB100").await.unwrap(),
        UserTurn::Say("Book AB100".to_string())
    );
    assert_eq!(
        user.reply("Shall I book it?").await.unwrap(),
        UserTurn::Say("Yes, please.".to_string())
    );
    assert_eq!(user.reply("Anything else?").await.unwrap(), UserTurn::Stop);
}

#[test]
fn test_agent_turns_are_tagged() {
    let turn = AgentTurn::Act(common::book_ab100());
    let value = serde_json::to_value(&turn).unwrap();
    assert_eq!(value["type"], "act");
    assert_eq!(value["value"]["name"], "book_flight");
}
