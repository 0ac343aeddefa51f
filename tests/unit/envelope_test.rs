//! Tests for remote-call envelopes

use prometheus_coordination::core::{Envelope, FieldErrors, GENERIC_FAILURE_MESSAGE};

#[test]
fn test_mixed_field_errors_keep_field_order() {
    let envelope: Envelope<()> = serde_json::from_str(
        r#"{"success":false,"message":"ignored","errors":{"name":["required"],"email":"invalid"}}"#,
    )
    .unwrap();

    assert_eq!(
        envelope.errors.as_ref().unwrap().get("email"),
        Some(&FieldErrors::One("invalid".to_string()))
    );
    assert_eq!(envelope.error_message(), "name: required; email: invalid");
}

#[test]
fn test_multiple_messages_per_field() {
    let envelope: Envelope<()> =
        Envelope::with_field_errors([("password", vec!["too short", "needs a digit"])]);
    assert_eq!(envelope.error_message(), "password: too short, needs a digit");
}

#[test]
fn test_rejected_without_message_is_generic() {
    let envelope: Envelope<String> = serde_json::from_str(r#"{"success":false,"data":null}"#).unwrap();
    assert_eq!(envelope.error_message(), GENERIC_FAILURE_MESSAGE);
}

#[test]
fn test_success_envelope_serializes_without_empty_fields() {
    let json = serde_json::to_value(Envelope::ok(vec![1, 2])).unwrap();
    assert_eq!(json, serde_json::json!({"success": true, "data": [1, 2]}));
}
