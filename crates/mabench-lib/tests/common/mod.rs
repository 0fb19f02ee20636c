#![allow(dead_code)]

use mabench_lib::airline::{self, AirlineDb};
use mabench_lib::task_env::Environment;
use mabench_types::{Action, StructuredResponse, Task};
use serde_json::{json, Value};

pub fn seed() -> Value {
    json!({
        "passengers": [
            { "id": 1, "name": "Ada Lovelace", "email": "ada@example.com", "membership": "gold" },
            { "id": 2, "name": "Alan Turing", "membership": "regular" }
        ],
        "flights": [
            { "number": "AB100", "origin": "SFO", "destination": "JFK", "date": "2024-05-01",
              "status": "available", "seats_available": 2, "price": 300.0 },
            { "number": "AB200", "origin": "SFO", "destination": "JFK", "date": "2024-05-02",
              "status": "available", "seats_available": 0, "price": 280.0 },
            { "number": "CD300", "origin": "JFK", "destination": "LAX", "date": "2024-05-03",
              "status": "cancelled", "seats_available": 10, "price": 150.0 },
            { "number": "EF400", "origin": "LAX", "destination": "SFO", "date": "2024-04-01",
              "status": "landed", "seats_available": 5, "price": 120.0 }
        ],
        "bookings": [
            { "id": "BK0001", "passenger_id": 2, "flight": "AB100" },
            { "id": "BK0002", "passenger_id": 2, "flight": "EF400" }
        ]
    })
}

pub fn book_ab100() -> Action {
    Action::new("book_flight", json!({ "passenger_id": 1, "flight": "AB100" }))
}

pub fn confirmed() -> StructuredResponse {
    StructuredResponse::from_value(json!({ "status": "confirmed" })).expect("object")
}

/// Passenger 1 books AB100 and confirms.
pub fn booking_task() -> Task {
    let mut task = Task::new(
        "airline-book-001",
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
