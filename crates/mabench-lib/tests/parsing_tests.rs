//! Tests for the structured response parser

use mabench_lib::parsing::ResponseParser;
use mabench_types::{
    FieldKind, FieldSpec, ParseFailureKind, ResponseSchema, StructuredResponse,
};
use rstest::rstest;
use serde_json::json;

fn booking_schema() -> ResponseSchema {
    ResponseSchema {
        fields: vec![
            FieldSpec {
                name: "status".to_string(),
                kind: FieldKind::String,
                required: true,
            },
            FieldSpec {
                name: "total".to_string(),
                kind: FieldKind::Number,
                required: true,
            },
            FieldSpec {
                name: "note".to_string(),
                kind: FieldKind::String,
                required: false,
            },
        ],
    }
}

#[test]
fn test_round_trip_through_delimiters() {
    let parser = ResponseParser::new(booking_schema());
    let original = StructuredResponse::from_value(json!({
        "status": "confirmed",
        "total": 335.5,
        "booking": { "id": "BK0003", "bags": [1, 2] }
    }))
    .unwrap();

    let text = format!("All set! {}\nHave a nice flight.", original.to_message());
    assert_eq!(parser.parse(&text).unwrap(), original);
}

#[rstest]
#[case::fenced("Here you go:\n```json\n{\"status\": \"confirmed\", \"total\": 300}\n```\n")]
#[case::bare("  {\"status\": \"confirmed\", \"total\": 300}  ")]
#[case::delimited("<final_response> {\"status\": \"confirmed\", \"total\": 300} </final_response>")]
fn test_extraction_strategies(#[case] text: &str) {
    let parser = ResponseParser::new(booking_schema());
    let response = parser.parse(text).unwrap();
    assert_eq!(response.get("status"), Some(&json!("confirmed")));
    // Integers are valid numbers
    assert_eq!(response.get("total"), Some(&json!(300)));
}

#[rstest]
#[case::no_payload("Your flight is booked.", ParseFailureKind::NoPayload)]
#[case::invalid_json("<final_response>{status: confirmed}</final_response>", ParseFailureKind::InvalidJson)]
#[case::not_an_object("<final_response>[1, 2]</final_response>", ParseFailureKind::NotAnObject)]
#[case::partial("{\"status\": \"confirmed\"}", ParseFailureKind::MissingField)]
#[case::wrong_type("{\"status\": \"confirmed\", \"total\": \"300\"}", ParseFailureKind::WrongType)]
#[case::optional_wrong_type(
    "{\"status\": \"confirmed\", \"total\": 1, \"note\": 5}",
    ParseFailureKind::WrongType
)]
#[case::unterminated("<final_response>{\"status\": \"confirmed\"", ParseFailureKind::NoPayload)]
fn test_failures_are_typed(#[case] text: &str, #[case] kind: ParseFailureKind) {
    let parser = ResponseParser::new(booking_schema());
    let failure = parser.parse(text).unwrap_err();
    assert_eq!(failure.kind, kind, "reason: {}", failure.reason);
    assert!(!failure.reason.is_empty());
}

#[test]
fn test_extra_fields_are_kept() {
    let parser = ResponseParser::new(ResponseSchema::default());
    let response = parser
        .parse("{\"status\": \"confirmed\", \"seat\": \"12A\"}")
        .unwrap();
    assert_eq!(response.fields.len(), 2);
}

#[test]
fn test_delimited_takes_precedence_over_fenced() {
    let parser = ResponseParser::new(ResponseSchema::default());
    let text = "```json\n{\"source\": \"fenced\"}\n```\n<final_response>{\"source\": \"tag\"}</final_response>";
    let response = parser.parse(text).unwrap();
    assert_eq!(response.get("source"), Some(&json!("tag")));
}
