//! Tests for the API error payload.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;
use uuid::Uuid;

#[fixture]
fn conflict() -> Error {
    Error::conflict("course is full").with_details(json!({ "code": "capacity_exceeded" }))
}

#[rstest]
#[case(Error::invalid_request("x"), ErrorCode::InvalidRequest)]
#[case(Error::unauthorized("x"), ErrorCode::Unauthorized)]
#[case(Error::forbidden("x"), ErrorCode::Forbidden)]
#[case(Error::not_found("x"), ErrorCode::NotFound)]
#[case(Error::conflict("x"), ErrorCode::Conflict)]
#[case(Error::service_unavailable("x"), ErrorCode::ServiceUnavailable)]
#[case(Error::internal("x"), ErrorCode::InternalError)]
fn convenience_constructors_set_code(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
fn try_new_rejects_blank_messages() {
    let result = Error::try_new(ErrorCode::Conflict, "   ");
    assert_eq!(result, Err(ErrorValidationError::EmptyMessage));
}

#[rstest]
fn new_substitutes_blank_messages() {
    let error = Error::new(ErrorCode::ServiceUnavailable, "");
    assert_eq!(error.message(), "service unavailable");
}

#[rstest]
fn try_with_trace_id_rejects_blank_values(conflict: Error) {
    let result = conflict.try_with_trace_id(" ");
    assert_eq!(result, Err(ErrorValidationError::EmptyTraceId));
}

#[rstest]
fn trace_id_is_absent_outside_scope() {
    assert!(Error::internal("boom").trace_id().is_none());
}

#[tokio::test]
async fn trace_id_is_captured_inside_scope() {
    let trace_id = TraceId::from_uuid(Uuid::nil());
    let error = TraceId::scope(trace_id, async { Error::not_found("missing") }).await;
    assert_eq!(error.trace_id(), Some("00000000-0000-0000-0000-000000000000"));
}

#[rstest]
fn serialises_camel_case_and_skips_empty_fields(conflict: Error) {
    let value = serde_json::to_value(&conflict).expect("serialise error");
    assert_eq!(
        value,
        json!({
            "code": "conflict",
            "message": "course is full",
            "details": { "code": "capacity_exceeded" }
        })
    );
}

#[rstest]
fn deserialises_trace_id() {
    let raw = json!({ "code": "not_found", "message": "gone", "traceId": "abc" });
    let error: Error = serde_json::from_value(raw).expect("deserialise error");
    assert_eq!(error.trace_id(), Some("abc"));
    assert_eq!(error.code(), ErrorCode::NotFound);
}
