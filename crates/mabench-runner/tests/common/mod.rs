#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use mabench_lib::agent::{AgentPolicy, AgentTurn, Observation};
use mabench_lib::airline::{self, AirlineDb};
use mabench_lib::task_env::Environment;
use mabench_types::{Action, StructuredResponse, Task};
use serde_json::{json, Value};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Route logs to the test harness; run with `RUST_LOG=debug -- --nocapture` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn seed() -> Value {
    json!({
        "passengers": [
            { "id": 1, "name": "Ada Lovelace", "membership": "gold" },
            { "id": 2, "name": "Alan Turing", "membership": "regular" }
        ],
        "flights": [
            { "number": "AB100", "origin": "SFO", "destination": "JFK", "date": "2024-05-01",
              "status": "available", "seats_available": 2, "price": 300.0 }
        ],
        "bookings": [
            { "id": "BK0001", "passenger_id": 2, "flight": "AB100" }
        ]
    })
}

pub fn book_ab100() -> Action {
    Action::new("book_flight", json!({ "passenger_id": 1, "flight": "AB100" }))
}

pub fn think() -> Action {
    Action::new("think", json!({ "thought": "Which flight did they mean?" }))
}

pub fn confirmed() -> StructuredResponse {
    StructuredResponse::from_value(json!({ "status": "confirmed" })).expect("object")
}

/// Passenger 1 books AB100 and confirms.
pub fn booking_task(id: &str) -> Task {
    let mut task = Task::new(
        id,
        "You are Ada Lovelace (passenger 1). Book flight AB100 for yourself.",
    );
    task.user_id = Some("1".to_string());
    task.initial_state = seed();
    task.actions = vec![book_ab100()];
    task.expected_output = Some(confirmed());
    task
}

pub fn env(max_turns: u32) -> Environment<AirlineDb> {
    airline::new_env(max_turns).expect("airline registry builds")
}

/// An agent that never answers in time.
pub struct SlowAgent {
    pub delay: Duration,
}

#[async_trait]
impl AgentPolicy for SlowAgent {
    fn name(&self) -> &str {
        "slow"
    }

    async fn act(&mut self, _observation: &Observation) -> Result<AgentTurn> {
        tokio::time::sleep(self.delay).await;
        Ok(AgentTurn::Act(think()))
    }
}
