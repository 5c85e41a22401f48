//! Driving port for enrollment mutations.
//!
//! Enrollment touches two stores (course roster and participant record). The
//! coordinator behind this port keeps them consistent and repairs one-sided
//! state when a caller retries after a partial failure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    AggregateKind, CascadeReport, CourseId, Enrollment, EnrollmentStatus, ParticipantId, Score,
    TrainingError,
};

/// Identifies one participant/course pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollmentRequest {
    /// Participant to enroll or withdraw.
    pub participant_id: ParticipantId,
    /// Target course.
    pub course_id: CourseId,
}

/// Result of a successful enroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentOutcome {
    /// Participant.
    pub participant_id: ParticipantId,
    /// Course.
    pub course_id: CourseId,
    /// Seat timestamp.
    pub enrolled_at: DateTime<Utc>,
    /// Side that was written to bring a one-sided enrollment back in line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repaired: Option<AggregateKind>,
}

/// Result of a successful withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalOutcome {
    /// Participant.
    pub participant_id: ParticipantId,
    /// Course.
    pub course_id: CourseId,
    /// Set when only one side still held a live enrollment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repaired: Option<AggregateKind>,
}

/// Status, score and notes update for an existing enrollment.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentStatusUpdate {
    /// Participant.
    pub participant_id: ParticipantId,
    /// Course.
    pub course_id: CourseId,
    /// New coarse status.
    pub status: EnrollmentStatus,
    /// New score; `None` keeps the stored one.
    pub score: Option<Score>,
    /// New notes; `None` keeps the stored ones.
    pub notes: Option<String>,
}

/// Enrollment use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentCommand: Send + Sync {
    /// Take a seat in a course.
    async fn enroll(&self, request: EnrollmentRequest) -> Result<EnrollmentOutcome, TrainingError>;

    /// Give up a seat; the records are kept as withdrawn.
    async fn withdraw(&self, request: EnrollmentRequest) -> Result<WithdrawalOutcome, TrainingError>;

    /// Record progress on an existing enrollment.
    async fn set_enrollment_status(
        &self,
        update: EnrollmentStatusUpdate,
    ) -> Result<Enrollment, TrainingError>;

    /// Delete a course after stripping every live enrollment that references
    /// it. Nothing is deleted unless every participant was updated.
    async fn delete_course(&self, course_id: CourseId) -> Result<CascadeReport, TrainingError>;
}
