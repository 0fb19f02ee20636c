//! # Backend State Store and Tool Registry
//!
//! A domain backend is a mutable state store plus a closed set of named
//! operations. Operations are registered once with a strongly-typed argument
//! struct; the registry decodes `Action.arguments` into that struct before the
//! handler ever sees the state, so unknown names and malformed arguments are
//! rejected without touching the store.

use crate::error::{BackendError, DomainError, RegistryError, ToolError};
use mabench_types::Action;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use strum::Display;

/// A simulated domain database owned by exactly one environment.
pub trait StateStore: Send {
    /// Replace the whole state with `snapshot`. Loading the same snapshot
    /// twice must produce the same state.
    fn load(&mut self, snapshot: &Value) -> Result<(), BackendError>;

    /// Serialize the current state.
    fn snapshot(&self) -> Value;
}

/// Effect class of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolKind {
    /// Queries state only.
    Read,
    /// Mutates state.
    Write,
    /// Ends the run when applied.
    Terminal,
}

impl ToolKind {
    pub fn is_mutating(&self) -> bool {
        matches!(self, ToolKind::Write)
    }
}

/// Public description of a registered operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub kind: ToolKind,
    pub description: String,
}

type Handler<S> = Box<dyn Fn(&mut S, Value) -> Result<Value, ToolError> + Send + Sync>;

struct Entry<S> {
    spec: ToolSpec,
    handler: Handler<S>,
}

/// Closed mapping from operation name to a typed handler over state `S`.
pub struct ToolRegistry<S> {
    tools: BTreeMap<String, Entry<S>>,
}

impl<S> Default for ToolRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ToolRegistry<S> {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register an operation whose arguments decode into `A`.
    ///
    /// Fails if the name is empty or already taken.
    pub fn register<A, F>(
        &mut self,
        name: &str,
        kind: ToolKind,
        description: &str,
        handler: F,
    ) -> Result<&mut Self, RegistryError>
    where
        S: 'static,
        A: DeserializeOwned + 'static,
        F: Fn(&mut S, A) -> Result<Value, DomainError> + Send + Sync + 'static,
    {
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.tools.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }

        let tool_name = name.to_string();
        let handler: Handler<S> = Box::new(move |state: &mut S, arguments: Value| {
            let args: A =
                serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
                    name: tool_name.clone(),
                    reason: e.to_string(),
                })?;
            handler(state, args).map_err(ToolError::Domain)
        });

        self.tools.insert(
            name.to_string(),
            Entry {
                spec: ToolSpec {
                    name: name.to_string(),
                    kind,
                    description: description.to_string(),
                },
                handler,
            },
        );
        Ok(self)
    }

    pub fn spec(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name).map(|entry| &entry.spec)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn specs(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.values().map(|entry| &entry.spec)
    }

    /// Names of pure query operations.
    pub fn read_only_names(&self) -> BTreeSet<String> {
        self.specs()
            .filter(|spec| spec.kind == ToolKind::Read)
            .map(|spec| spec.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Decode the action's arguments and run its handler against `state`.
    pub fn invoke(&self, state: &mut S, action: &Action) -> Result<Value, ToolError> {
        let entry = self
            .tools
            .get(&action.name)
            .ok_or_else(|| ToolError::Unknown(action.name.clone()))?;
        (entry.handler)(state, action.arguments_value())
    }
}

impl<S> fmt::Debug for ToolRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
