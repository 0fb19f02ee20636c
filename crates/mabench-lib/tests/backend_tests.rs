//! Tests for the closed tool registry

use mabench_lib::backend::{ToolKind, ToolRegistry};
use mabench_lib::error::{DomainError, RegistryError, ToolError};
use mabench_types::Action;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Default)]
struct Counter {
    value: i64,
}

#[derive(Deserialize)]
struct AddArgs {
    amount: i64,
}

fn counter_registry() -> ToolRegistry<Counter> {
    let mut registry = ToolRegistry::new();
    registry
        .register(
            "add",
            ToolKind::Write,
            "Add to the counter",
            |state: &mut Counter, args: AddArgs| {
                if args.amount < 0 {
                    return Err(DomainError::new("amount must be positive"));
                }
                state.value += args.amount;
                Ok(json!(state.value))
            },
        )
        .unwrap()
        .register(
            "get",
            ToolKind::Read,
            "Read the counter",
            |state: &mut Counter, _: Value| Ok(json!(state.value)),
        )
        .unwrap();
    registry
}

#[test]
fn test_duplicate_registration_is_rejected() {
    let mut registry = counter_registry();
    let err = registry
        .register("add", ToolKind::Write, "again", |_: &mut Counter, _: Value| {
            Ok(Value::Null)
        })
        .unwrap_err();
    assert_eq!(err, RegistryError::Duplicate("add".to_string()));
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_empty_name_is_rejected() {
    let mut registry = counter_registry();
    let err = registry
        .register("  ", ToolKind::Read, "blank", |_: &mut Counter, _: Value| {
            Ok(Value::Null)
        })
        .unwrap_err();
    assert_eq!(err, RegistryError::EmptyName);
}

#[test]
fn test_invoke_applies_typed_handler() {
    let registry = counter_registry();
    let mut state = Counter::default();
    let output = registry
        .invoke(&mut state, &Action::new("add", json!({ "amount": 5 })))
        .unwrap();
    assert_eq!(output, json!(5));
    assert_eq!(state.value, 5);
}

#[test]
fn test_unknown_and_malformed_leave_state_untouched() {
    let registry = counter_registry();
    let mut state = Counter { value: 3 };

    let err = registry
        .invoke(&mut state, &Action::named("delete_universe"))
        .unwrap_err();
    assert_eq!(err, ToolError::Unknown("delete_universe".to_string()));

    let err = registry
        .invoke(&mut state, &Action::new("add", json!({ "amount": "lots" })))
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments { ref name, .. } if name == "add"));
    assert_eq!(state.value, 3);
}

#[test]
fn test_domain_error_is_surfaced() {
    let registry = counter_registry();
    let mut state = Counter::default();
    let err = registry
        .invoke(&mut state, &Action::new("add", json!({ "amount": -1 })))
        .unwrap_err();
    assert_eq!(
        err,
        ToolError::Domain(DomainError::new("amount must be positive"))
    );
    assert_eq!(err.to_string(), "amount must be positive");
}

#[test]
fn test_read_only_names() {
    let registry = counter_registry();
    let reads = registry.read_only_names();
    assert!(reads.contains("get"));
    assert!(!reads.contains("add"));
    assert_eq!(registry.names(), vec!["add".to_string(), "get".to_string()]);
}
