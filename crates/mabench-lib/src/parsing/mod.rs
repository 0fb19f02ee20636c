//! Structured response parsing for free-form agent messages.
//!
//! The agent normally hands over its final answer as a tagged
//! [`FinalResponse::Structured`](crate::agent::FinalResponse) value. When it
//! answers in text instead, this module is the only place that turns text
//! into a [`StructuredResponse`]. Extraction tries, in order:
//!
//! - a `<final_response>…</final_response>` delimited payload
//! - a fenced ```` ```json ```` code block
//! - the whole (trimmed) message, when it is a JSON object
//!
//! The payload is then validated against a [`ResponseSchema`]. Validation is
//! all-or-nothing: a response missing one required field is a failure, never
//! a partially filled value.

use mabench_types::{
    ParseFailure, ParseFailureKind, ResponseSchema, StructuredResponse, FINAL_RESPONSE_CLOSE,
    FINAL_RESPONSE_OPEN,
};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, info};

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*\n(.*?)```").expect("fenced block pattern is valid")
});

/// Extracts and validates structured final answers.
#[derive(Debug, Clone, Default)]
pub struct ResponseParser {
    schema: ResponseSchema,
}

impl ResponseParser {
    pub fn new(schema: ResponseSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &ResponseSchema {
        &self.schema
    }

    /// Parse `text` into a schema-conformant response. Never panics.
    pub fn parse(&self, text: &str) -> Result<StructuredResponse, ParseFailure> {
        let payload = Self::extract_payload(text).ok_or_else(|| {
            ParseFailure::new(
                ParseFailureKind::NoPayload,
                "no delimited, fenced or bare JSON payload found",
            )
        })?;

        let value: Value = serde_json::from_str(payload).map_err(|e| {
            ParseFailure::new(ParseFailureKind::InvalidJson, format!("invalid JSON: {e}"))
        })?;

        let kind = value_kind(&value);
        let response = StructuredResponse::from_value(value).ok_or_else(|| {
            ParseFailure::new(
                ParseFailureKind::NotAnObject,
                format!("expected a JSON object, found {kind}"),
            )
        })?;

        self.validate(&response)?;
        debug!(fields = response.fields.len(), "[ResponseParser] Parsed structured response");
        Ok(response)
    }

    /// Check every required field is present and of the declared kind.
    pub fn validate(&self, response: &StructuredResponse) -> Result<(), ParseFailure> {
        for field in self.schema.required_fields() {
            let Some(value) = response.get(&field.name) else {
                return Err(ParseFailure::new(
                    ParseFailureKind::MissingField,
                    format!("required field '{}' is missing", field.name),
                ));
            };
            if !field.kind.accepts(value) {
                return Err(ParseFailure::new(
                    ParseFailureKind::WrongType,
                    format!(
                        "field '{}' must be {}, found {}",
                        field.name,
                        field.kind,
                        value_kind(value)
                    ),
                ));
            }
        }
        // Optional fields are only type-checked when present.
        for field in self.schema.fields.iter().filter(|f| !f.required) {
            if let Some(value) = response.get(&field.name) {
                if !value.is_null() && !field.kind.accepts(value) {
                    return Err(ParseFailure::new(
                        ParseFailureKind::WrongType,
                        format!(
                            "field '{}' must be {}, found {}",
                            field.name,
                            field.kind,
                            value_kind(value)
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Locate the payload: delimited tag, then fenced block, then bare object.
    fn extract_payload(text: &str) -> Option<&str> {
        if let Some(payload) = Self::delimited(text) {
            info!("[ResponseParser] Using delimited final response payload");
            return Some(payload);
        }

        if let Some(captures) = FENCED_JSON.captures(text) {
            if let Some(block) = captures.get(1) {
                info!("[ResponseParser] Using fenced JSON block payload");
                return Some(block.as_str().trim());
            }
        }

        let trimmed = text.trim();
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            info!("[ResponseParser] Using bare JSON object payload");
            return Some(trimmed);
        }
        None
    }

    fn delimited(text: &str) -> Option<&str> {
        let start = text.find(FINAL_RESPONSE_OPEN)? + FINAL_RESPONSE_OPEN.len();
        let end = text[start..].find(FINAL_RESPONSE_CLOSE)? + start;
        Some(text[start..end].trim())
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
