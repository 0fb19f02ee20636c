use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single operation requested by an agent: an operation name plus its arguments.
///
/// Arguments are kept in a sorted map so two actions built from the same
/// name/argument pairs compare and hash identically regardless of the order
/// in which the arguments were supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// The registry name of the operation (e.g. "book_flight").
    pub name: String,
    /// The parameters passed to the operation.
    #[serde(default)]
    pub arguments: BTreeMap<String, Value>,
}

impl Action {
    /// Create an action from a name and a JSON object of arguments.
    ///
    /// Anything other than a JSON object is treated as "no arguments".
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Create an action without arguments.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: BTreeMap::new(),
        }
    }

    /// Look up a single argument.
    pub fn argument(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key)
    }

    /// The arguments as a JSON object, ready to be handed to a tool handler.
    pub fn arguments_value(&self) -> Value {
        Value::Object(self.arguments.clone().into_iter().collect())
    }
}

impl Hash for Action {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.arguments.len().hash(state);
        for (key, value) in &self.arguments {
            key.hash(state);
            hash_value(value, state);
        }
    }
}

/// Hash a JSON value consistently with `Value`'s `PartialEq`: `0.0` and
/// `-0.0` hash alike and object keys are visited in sorted order.
fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    std::mem::discriminant(value).hash(state);
    match value {
        Value::Null => {}
        Value::Bool(b) => b.hash(state),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                (0u8, u).hash(state);
            } else if let Some(i) = n.as_i64() {
                (1u8, i).hash(state);
            } else if let Some(f) = n.as_f64() {
                let f = if f == 0.0 { 0.0 } else { f };
                (2u8, f.to_bits()).hash(state);
            }
        }
        Value::String(s) => s.hash(state),
        Value::Array(items) => {
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(map) => {
            map.len().hash(state);
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (key, item) in entries {
                key.hash(state);
                hash_value(item, state);
            }
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.arguments_value())
    }
}
