use serde_json::json;
use sqlgate::models::{EnvelopeFailure, QUERY_ENVELOPE_SCHEMA_VERSION, QueryEnvelope};
use sqlgate::{GatewayError, ValidationError};

#[test]
fn ok_envelope_tracks_contract_fields() {
    let envelope = QueryEnvelope::ok(
        "query",
        json!({"rows": [{"id": 1}, {"id": 2}]}),
    )
    .with_meta("row_count", json!(2))
    .with_warning(
        "result_truncated",
        "result truncated to row_cap",
        Some(json!({"row_cap": 2})),
    );

    assert!(envelope.ok);
    assert_eq!(envelope.command, "query");
    assert!(envelope.generated_at_utc.ends_with('Z'));
    assert_eq!(
        envelope.meta.get("schema_version"),
        Some(&json!(QUERY_ENVELOPE_SCHEMA_VERSION))
    );
    assert_eq!(envelope.meta.get("row_count"), Some(&json!(2)));
    assert_eq!(envelope.warnings.len(), 1);
    assert_eq!(envelope.warnings[0].code, "result_truncated");
    assert_eq!(
        envelope.warnings[0].details.as_ref(),
        Some(&json!({"row_cap": 2}))
    );
    assert!(envelope.error.is_none());
}

#[test]
fn ok_envelope_omits_error_field() {
    let envelope = QueryEnvelope::ok("check", json!({"canonical_sql": "SELECT 1"}));
    let encoded = serde_json::to_value(&envelope).expect("envelope should serialize");

    let object = encoded
        .as_object()
        .expect("query envelope JSON should be object");
    assert_eq!(object.get("ok"), Some(&json!(true)));
    assert_eq!(object.get("command"), Some(&json!("check")));
    for key in ["generated_at_utc", "data", "meta", "warnings"] {
        assert!(object.contains_key(key), "missing {key}");
    }
    assert!(!object.contains_key("error"));
}

#[test]
fn rejection_envelope_carries_error_code_and_details() {
    let error = GatewayError::from(ValidationError::MultipleStatements { count: 2 });
    let failure = EnvelopeFailure::from_gateway_error("query", &error);
    assert!(failure.is_rejection());

    let encoded = serde_json::to_value(failure.envelope()).expect("envelope should serialize");
    assert_eq!(encoded.pointer("/ok"), Some(&json!(false)));
    assert_eq!(
        encoded.pointer("/error/code"),
        Some(&json!("multiple_statements"))
    );
    assert_eq!(
        encoded.pointer("/error/message"),
        Some(&json!(
            "query rejected: exactly one statement is allowed, found 2"
        ))
    );
    assert_eq!(
        encoded.pointer("/error/details/validation"),
        Some(&json!(true))
    );
    assert!(encoded.get("data").is_none());
}

#[test]
fn envelopes_round_trip_through_json() {
    let envelope = QueryEnvelope::error("tag", "storage_unavailable", "unable to open database")
        .with_error_details(json!({"path": "/srv/leads.db"}));
    let encoded = envelope.to_json().expect("envelope should encode");
    let decoded =
        serde_json::from_str::<QueryEnvelope>(&encoded).expect("envelope should decode");
    assert_eq!(decoded, envelope);
}
