//! Failures raised by the training services.
//!
//! Every variant has a stable snake_case discriminator that the HTTP layer
//! exposes as `details.code`, so clients can branch on it without parsing
//! messages.

use serde_json::{Value, json};
use tracing::error;
use uuid::Uuid;

use super::{
    AggregateKind, AggregateRef, CascadeReport, CompanyId, CompanyValidationError,
    ContactValidationError, CourseId, CourseValidationError, Error, ParticipantId,
    ParticipantValidationError,
};

/// Failure of a training operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrainingError {
    /// A referenced document does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Collection searched.
        kind: AggregateKind,
        /// Missing id.
        id: Uuid,
    },
    /// The participant holds no certificate with this storage id.
    #[error("participant {participant_id} has no certificate {public_id}")]
    CertificateNotFound {
        /// Participant.
        participant_id: ParticipantId,
        /// Storage id looked up.
        public_id: String,
    },
    /// Both sides already record a live enrollment.
    #[error("participant {participant_id} is already enrolled in course {course_id}")]
    AlreadyEnrolled {
        /// Participant.
        participant_id: ParticipantId,
        /// Course.
        course_id: CourseId,
    },
    /// Neither side records a live enrollment.
    #[error("participant {participant_id} is not enrolled in course {course_id}")]
    NotEnrolled {
        /// Participant.
        participant_id: ParticipantId,
        /// Course.
        course_id: CourseId,
    },
    /// Every seat is taken.
    #[error("course {course_id} is full ({maximum} seats)")]
    CapacityExceeded {
        /// Course.
        course_id: CourseId,
        /// `cupoMaximo` at the time of the check.
        maximum: u32,
    },
    /// The participant is linked to a different company.
    #[error("participant {participant_id} is already affiliated with {company_name}")]
    AlreadyAffiliatedElsewhere {
        /// Participant.
        participant_id: ParticipantId,
        /// Current company.
        company_id: CompanyId,
        /// Current company name as recorded on the participant.
        company_name: String,
    },
    /// Neither side references the other.
    #[error("participant {participant_id} is not affiliated with company {company_id}")]
    NotAffiliated {
        /// Participant.
        participant_id: ParticipantId,
        /// Company.
        company_id: CompanyId,
    },
    /// The company still has affiliates.
    #[error("company {company_id} still has {count} affiliated participants")]
    HasAffiliates {
        /// Company.
        company_id: CompanyId,
        /// Participants still referencing it.
        count: usize,
    },
    /// The participant is already soft-deleted.
    #[error("participant {participant_id} is already inactive")]
    AlreadyInactive {
        /// Participant.
        participant_id: ParticipantId,
    },
    /// Inactive participants cannot enroll.
    #[error("participant {participant_id} is inactive")]
    ParticipantInactive {
        /// Participant.
        participant_id: ParticipantId,
    },
    /// Another company already uses the tax id.
    #[error("tax id {tax_id} is already registered")]
    TaxIdTaken {
        /// Offending tax id.
        tax_id: String,
    },
    /// Another participant already uses the email.
    #[error("email {email} is already registered")]
    EmailTaken {
        /// Offending email.
        email: String,
    },
    /// Input failed field validation.
    #[error("{message}")]
    ValidationFailed {
        /// Human-readable reason.
        message: String,
    },
    /// The document changed underneath the operation and retries ran out.
    #[error("{target} was modified concurrently (expected revision {expected}, found {actual})")]
    StaleRevision {
        /// Contended document.
        target: AggregateRef,
        /// Revision the write expected.
        expected: u32,
        /// Revision actually stored.
        actual: u32,
    },
    /// A uniqueness rule was violated at the store.
    #[error("{message}")]
    Conflict {
        /// Human-readable reason.
        message: String,
    },
    /// A store was unreachable or timed out.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Store failure description.
        message: String,
    },
    /// The first write of a two-sided operation landed and the second did not.
    #[error("{ahead} was updated but {behind} was not: {message}; retry the operation to repair")]
    PartialWriteFailure {
        /// Document that holds the new state.
        ahead: AggregateRef,
        /// Document still holding the old state.
        behind: AggregateRef,
        /// Failure of the second write.
        message: String,
    },
    /// Some dependents could not be updated, so the parent was left in place.
    #[error("{parent} was not removed: {} dependent updates failed", .report.failures().count())]
    CascadeIncomplete {
        /// Document whose removal was aborted.
        parent: AggregateRef,
        /// Per-dependent outcome.
        report: CascadeReport,
    },
    /// Unexpected store or serialisation failure.
    #[error("internal error: {message}")]
    Internal {
        /// Failure description.
        message: String,
    },
}

impl TrainingError {
    /// Missing course.
    pub fn course_not_found(id: CourseId) -> Self {
        Self::NotFound {
            kind: AggregateKind::Course,
            id: id.into(),
        }
    }

    /// Missing participant.
    pub fn participant_not_found(id: ParticipantId) -> Self {
        Self::NotFound {
            kind: AggregateKind::Participant,
            id: id.into(),
        }
    }

    /// Missing company.
    pub fn company_not_found(id: CompanyId) -> Self {
        Self::NotFound {
            kind: AggregateKind::Company,
            id: id.into(),
        }
    }

    /// Field validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    /// Log and build a [`TrainingError::PartialWriteFailure`].
    pub fn diverged(ahead: AggregateRef, behind: AggregateRef, cause: &Self) -> Self {
        error!(
            %ahead,
            %behind,
            %cause,
            "two-sided write diverged; retrying the operation repairs it"
        );
        Self::PartialWriteFailure {
            ahead,
            behind,
            message: cause.to_string(),
        }
    }

    /// Stable discriminator exposed as `details.code`.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::CertificateNotFound { .. } => "certificate_not_found",
            Self::AlreadyEnrolled { .. } => "already_enrolled",
            Self::NotEnrolled { .. } => "not_enrolled",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::AlreadyAffiliatedElsewhere { .. } => "already_affiliated_elsewhere",
            Self::NotAffiliated { .. } => "not_affiliated",
            Self::HasAffiliates { .. } => "has_affiliates",
            Self::AlreadyInactive { .. } => "already_inactive",
            Self::ParticipantInactive { .. } => "participant_inactive",
            Self::TaxIdTaken { .. } => "tax_id_taken",
            Self::EmailTaken { .. } => "email_taken",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::StaleRevision { .. } => "stale_revision",
            Self::Conflict { .. } => "conflict",
            Self::Unavailable { .. } => "unavailable",
            Self::PartialWriteFailure { .. } => "partial_write_failure",
            Self::CascadeIncomplete { .. } => "cascade_incomplete",
            Self::Internal { .. } => "internal",
        }
    }

    fn details(&self) -> Value {
        let code = self.code();
        match self {
            Self::NotFound { kind, id } => json!({ "code": code, "kind": kind, "id": id }),
            Self::CertificateNotFound {
                participant_id,
                public_id,
            } => json!({ "code": code, "participantId": participant_id, "publicId": public_id }),
            Self::AlreadyEnrolled {
                participant_id,
                course_id,
            }
            | Self::NotEnrolled {
                participant_id,
                course_id,
            } => json!({ "code": code, "participantId": participant_id, "courseId": course_id }),
            Self::CapacityExceeded { course_id, maximum } => {
                json!({ "code": code, "courseId": course_id, "cupoMaximo": maximum })
            }
            Self::AlreadyAffiliatedElsewhere {
                participant_id,
                company_id,
                company_name,
            } => json!({
                "code": code,
                "participantId": participant_id,
                "companyId": company_id,
                "companyName": company_name,
            }),
            Self::NotAffiliated {
                participant_id,
                company_id,
            } => json!({ "code": code, "participantId": participant_id, "companyId": company_id }),
            Self::HasAffiliates { company_id, count } => {
                json!({ "code": code, "companyId": company_id, "count": count })
            }
            Self::AlreadyInactive { participant_id } | Self::ParticipantInactive { participant_id } => {
                json!({ "code": code, "participantId": participant_id })
            }
            Self::TaxIdTaken { tax_id } => json!({ "code": code, "taxId": tax_id }),
            Self::EmailTaken { email } => json!({ "code": code, "email": email }),
            Self::StaleRevision {
                target,
                expected,
                actual,
            } => json!({
                "code": code,
                "target": target,
                "expectedRevision": expected,
                "actualRevision": actual,
            }),
            Self::PartialWriteFailure { ahead, behind, .. } => {
                json!({ "code": code, "ahead": ahead, "behind": behind })
            }
            Self::CascadeIncomplete { parent, report } => {
                json!({ "code": code, "parent": parent, "report": report })
            }
            Self::ValidationFailed { .. }
            | Self::Conflict { .. }
            | Self::Unavailable { .. }
            | Self::Internal { .. } => json!({ "code": code }),
        }
    }
}

impl From<TrainingError> for Error {
    fn from(value: TrainingError) -> Self {
        let details = value.details();
        let message = value.to_string();
        let error = match value {
            TrainingError::NotFound { .. } | TrainingError::CertificateNotFound { .. } => {
                Self::not_found(message)
            }
            TrainingError::ValidationFailed { .. } => Self::invalid_request(message),
            TrainingError::Unavailable { .. } => Self::service_unavailable(message),
            TrainingError::Internal { .. } => {
                error!(error = %message, "training operation failed");
                Self::internal(message)
            }
            TrainingError::PartialWriteFailure { .. } | TrainingError::CascadeIncomplete { .. } => {
                Self::service_unavailable(message)
            }
            TrainingError::AlreadyEnrolled { .. }
            | TrainingError::NotEnrolled { .. }
            | TrainingError::CapacityExceeded { .. }
            | TrainingError::AlreadyAffiliatedElsewhere { .. }
            | TrainingError::NotAffiliated { .. }
            | TrainingError::HasAffiliates { .. }
            | TrainingError::AlreadyInactive { .. }
            | TrainingError::ParticipantInactive { .. }
            | TrainingError::TaxIdTaken { .. }
            | TrainingError::EmailTaken { .. }
            | TrainingError::StaleRevision { .. }
            | TrainingError::Conflict { .. } => Self::conflict(message),
        };
        error.with_details(details)
    }
}

macro_rules! validation_into_training_error {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for TrainingError {
                fn from(value: $source) -> Self {
                    Self::validation(value.to_string())
                }
            }
        )*
    };
}

validation_into_training_error!(
    CourseValidationError,
    ParticipantValidationError,
    CompanyValidationError,
    ContactValidationError,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    fn capacity_exceeded_maps_to_conflict_with_code() {
        let course_id = CourseId::from_uuid(Uuid::nil());
        let error = Error::from(TrainingError::CapacityExceeded {
            course_id,
            maximum: 1,
        });
        assert_eq!(error.code(), ErrorCode::Conflict);
        assert_eq!(
            error.details(),
            Some(&json!({
                "code": "capacity_exceeded",
                "courseId": "00000000-0000-0000-0000-000000000000",
                "cupoMaximo": 1
            }))
        );
    }

    #[rstest]
    #[case(TrainingError::course_not_found(CourseId::random()), ErrorCode::NotFound)]
    #[case(
        TrainingError::CertificateNotFound {
            participant_id: ParticipantId::random(),
            public_id: "cert-1".to_owned(),
        },
        ErrorCode::NotFound
    )]
    #[case(TrainingError::validation("bad"), ErrorCode::InvalidRequest)]
    #[case(TrainingError::Unavailable { message: "timeout".to_owned() }, ErrorCode::ServiceUnavailable)]
    #[case(TrainingError::Internal { message: "boom".to_owned() }, ErrorCode::InternalError)]
    #[case(TrainingError::AlreadyInactive { participant_id: ParticipantId::random() }, ErrorCode::Conflict)]
    fn maps_variants_to_error_codes(#[case] source: TrainingError, #[case] expected: ErrorCode) {
        assert_eq!(Error::from(source).code(), expected);
    }

    #[rstest]
    fn partial_write_names_both_sides() {
        let ahead = AggregateRef::new(AggregateKind::Course, Uuid::nil());
        let behind = AggregateRef::new(AggregateKind::Participant, Uuid::nil());
        let cause = TrainingError::Unavailable {
            message: "participant store timed out".to_owned(),
        };
        let error = TrainingError::diverged(ahead, behind, &cause);
        let api = Error::from(error);
        assert_eq!(api.code(), ErrorCode::ServiceUnavailable);
        let details = api.details().expect("details present");
        assert_eq!(details["code"], "partial_write_failure");
        assert_eq!(details["ahead"]["kind"], "course");
        assert_eq!(details["behind"]["kind"], "participant");
    }

    #[rstest]
    fn validation_errors_convert() {
        let error = TrainingError::from(CompanyValidationError::EmptyField { field: "name" });
        assert_eq!(error, TrainingError::validation("name must not be empty"));
    }
}
