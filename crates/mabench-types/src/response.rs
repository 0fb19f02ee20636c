use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// Opening delimiter of a structured final answer inside a free-form message.
pub const FINAL_RESPONSE_OPEN: &str = "<final_response>";
/// Closing delimiter of a structured final answer inside a free-form message.
pub const FINAL_RESPONSE_CLOSE: &str = "</final_response>";

/// A schema-validated final answer, e.g. a booking confirmation record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredResponse {
    pub fields: BTreeMap<String, Value>,
}

impl StructuredResponse {
    /// Build a response from a JSON object. Returns `None` for any other value.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self {
                fields: map.into_iter().collect(),
            }),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone().into_iter().collect())
    }

    /// Render the response in the delimited format the parser extracts.
    pub fn to_message(&self) -> String {
        format!(
            "{FINAL_RESPONSE_OPEN}{}{FINAL_RESPONSE_CLOSE}",
            self.to_value()
        )
    }
}

/// JSON kind a structured response field must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Any,
}

impl FieldKind {
    /// The most specific kind describing `value`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => FieldKind::String,
            Value::Number(n) if n.is_i64() || n.is_u64() => FieldKind::Integer,
            Value::Number(_) => FieldKind::Number,
            Value::Bool(_) => FieldKind::Boolean,
            Value::Array(_) => FieldKind::Array,
            Value::Object(_) => FieldKind::Object,
            Value::Null => FieldKind::Any,
        }
    }

    /// Whether `value` conforms to this kind. Integers are valid numbers.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Array => value.is_array(),
            FieldKind::Object => value.is_object(),
            FieldKind::Any => true,
        }
    }
}

/// Declaration of a single field of a structured response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// The shape a structured response must have to be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseSchema {
    pub fields: Vec<FieldSpec>,
}

impl ResponseSchema {
    /// Derive a schema from an expected response: every field is required
    /// and must have the same JSON kind as the expected value.
    pub fn from_expected(expected: &StructuredResponse) -> Self {
        let fields = expected
            .fields
            .iter()
            .map(|(name, value)| FieldSpec {
                name: name.clone(),
                kind: FieldKind::of(value),
                required: true,
            })
            .collect();
        Self { fields }
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }
}

/// Why a structured response could not be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParseFailureKind {
    NoPayload,
    InvalidJson,
    NotAnObject,
    MissingField,
    WrongType,
}

/// A typed, human-readable parse failure. Never a partially filled response.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {reason}")]
pub struct ParseFailure {
    pub kind: ParseFailureKind,
    pub reason: String,
}

impl ParseFailure {
    pub fn new(kind: ParseFailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

/// What the agent produced as its final answer, if anything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ResponseOutcome {
    Parsed(StructuredResponse),
    Failed(ParseFailure),
    #[default]
    Missing,
}

impl ResponseOutcome {
    pub fn response(&self) -> Option<&StructuredResponse> {
        match self {
            ResponseOutcome::Parsed(response) => Some(response),
            _ => None,
        }
    }
}

impl From<Result<StructuredResponse, ParseFailure>> for ResponseOutcome {
    fn from(result: Result<StructuredResponse, ParseFailure>) -> Self {
        match result {
            Ok(response) => ResponseOutcome::Parsed(response),
            Err(failure) => ResponseOutcome::Failed(failure),
        }
    }
}
