//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every helper yields an `invalid_request` error whose details name the
//! offending field, so clients can highlight it.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::{Error, IdValidationError};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidUuid,
    InvalidTimestamp,
    InvalidValue,
}

impl ErrorCode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::InvalidUuid => "invalid_uuid",
            Self::InvalidTimestamp => "invalid_timestamp",
            Self::InvalidValue => "invalid_value",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    const fn as_str(self) -> &'static str {
        self.0
    }
}

/// Builder for validation errors with field context.
struct ValidationError {
    field: &'static str,
    message: String,
}

impl ValidationError {
    fn new(field: FieldName, message: impl Into<String>) -> Self {
        Self {
            field: field.as_str(),
            message: message.into(),
        }
    }

    fn with_code(self, code: ErrorCode) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "code": code.as_str(),
        }))
    }

    fn with_value(self, code: ErrorCode, value: &str) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "value": value,
            "code": code.as_str(),
        }))
    }
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let name = field.as_str();
    ValidationError::new(field, format!("missing required field: {name}"))
        .with_code(ErrorCode::MissingField)
}

pub(crate) fn invalid_uuid_error(field: FieldName, value: &str) -> Error {
    let name = field.as_str();
    ValidationError::new(field, format!("{name} must be a valid UUID"))
        .with_value(ErrorCode::InvalidUuid, value)
}

/// Field-scoped error for values that parse but break a domain rule.
pub(crate) fn invalid_field_error(field: FieldName, message: impl Into<String>) -> Error {
    ValidationError::new(field, message).with_code(ErrorCode::InvalidValue)
}

/// Parse a typed identifier from a path segment or body field.
pub(crate) fn parse_id<T>(value: &str, field: FieldName) -> Result<T, Error>
where
    T: FromStr<Err = IdValidationError>,
{
    value
        .parse()
        .map_err(|_: IdValidationError| invalid_uuid_error(field, value))
}

/// Like [`parse_id`] but fails with `missing_field` when absent.
pub(crate) fn require_id<T>(value: Option<&str>, field: FieldName) -> Result<T, Error>
where
    T: FromStr<Err = IdValidationError>,
{
    let raw = value.ok_or_else(|| missing_field_error(field))?;
    parse_id(raw, field)
}

pub(crate) fn invalid_timestamp_error(field: FieldName, value: &str) -> Error {
    let name = field.as_str();
    ValidationError::new(field, format!("{name} must be an RFC 3339 timestamp"))
        .with_value(ErrorCode::InvalidTimestamp, value)
}

pub(crate) fn parse_rfc3339_timestamp(
    value: &str,
    field: FieldName,
) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| invalid_timestamp_error(field, value))
}

pub(crate) fn parse_optional_rfc3339_timestamp(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<DateTime<Utc>>, Error> {
    value
        .map(|raw| parse_rfc3339_timestamp(raw, field))
        .transpose()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::Value;

    use super::*;
    use crate::domain::{CourseId, ErrorCode as ApiCode};

    const FIELD: FieldName = FieldName::new("participantId");

    fn detail<'a>(error: &'a Error, key: &str) -> Option<&'a Value> {
        error.details().and_then(|details| details.get(key))
    }

    #[rstest]
    fn parses_valid_ids() {
        let id = CourseId::random();
        let parsed: CourseId = parse_id(&id.to_string(), FIELD).expect("valid id");
        assert_eq!(parsed, id);
    }

    #[rstest]
    #[case("nope")]
    #[case("")]
    #[case("123e4567-e89b-12d3-a456")]
    fn rejects_malformed_ids(#[case] raw: &str) {
        let error = parse_id::<CourseId>(raw, FIELD).expect_err("malformed");
        assert_eq!(error.code(), ApiCode::InvalidRequest);
        assert_eq!(detail(&error, "field"), Some(&json!("participantId")));
        assert_eq!(detail(&error, "code"), Some(&json!("invalid_uuid")));
        assert_eq!(detail(&error, "value"), Some(&json!(raw)));
    }

    #[rstest]
    fn absent_ids_are_missing_fields() {
        let error = require_id::<CourseId>(None, FIELD).expect_err("absent");
        assert_eq!(error.message(), "missing required field: participantId");
        assert_eq!(detail(&error, "code"), Some(&json!("missing_field")));
    }

    #[rstest]
    #[case(Some("2026-03-01T10:00:00Z"), true)]
    #[case(Some("2026-03-01T04:00:00-06:00"), true)]
    #[case(None, false)]
    fn parses_optional_timestamps(#[case] raw: Option<&str>, #[case] present: bool) {
        let parsed = parse_optional_rfc3339_timestamp(raw, FieldName::new("uploadedAt"))
            .expect("valid timestamp");
        assert_eq!(parsed.is_some(), present);
    }

    #[rstest]
    fn rejects_bad_timestamps() {
        let error = parse_rfc3339_timestamp("yesterday", FieldName::new("uploadedAt"))
            .expect_err("bad timestamp");
        assert_eq!(detail(&error, "code"), Some(&json!("invalid_timestamp")));
    }
}
