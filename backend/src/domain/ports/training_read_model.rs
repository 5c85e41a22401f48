//! Driving port for the denormalised read models.
//!
//! Views are assembled on demand from the three stores. They never fail
//! because a referenced document is gone: a deleted course shows up as
//! `course: null`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    Company, CompanyId, CompanyStatus, Course, CourseId, CourseKind, EnrollmentStatus,
    ParticipantId, ParticipantStatus, TrainingError,
};

/// Compact course description embedded in views.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    /// Course id.
    pub id: CourseId,
    /// Course name.
    pub name: String,
    /// Offering kind.
    pub kind: CourseKind,
    /// First session.
    pub starts_at: DateTime<Utc>,
    /// Last session.
    pub ends_at: DateTime<Utc>,
    /// Instructor.
    pub instructor: String,
    /// Total hours.
    pub duration_hours: u32,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        let details = course.details();
        Self {
            id: course.id(),
            name: details.name.clone(),
            kind: details.kind,
            starts_at: details.starts_at,
            ends_at: details.ends_at,
            instructor: details.instructor.clone(),
            duration_hours: details.duration_hours,
        }
    }
}

/// One enrollment with its course resolved.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentView {
    /// Referenced course id.
    pub course_id: CourseId,
    /// Resolved course, `null` when it no longer exists.
    pub course: Option<CourseSummary>,
    /// Enrollment status.
    pub status: EnrollmentStatus,
    /// Seat timestamp.
    pub enrolled_at: DateTime<Utc>,
    /// Score, when graded.
    pub score: Option<f64>,
    /// Notes, when present.
    pub notes: Option<String>,
}

/// Participant with resolved enrollments.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateView {
    /// Participant id.
    pub participant_id: ParticipantId,
    /// Full name.
    pub name: String,
    /// Email.
    pub email: String,
    /// Job title.
    pub position: String,
    /// Account state.
    pub status: ParticipantStatus,
    /// Enrollment history.
    pub enrollments: Vec<EnrollmentView>,
}

/// Headline numbers of a company overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStatistics {
    /// Affiliates found.
    pub total_participants: usize,
    /// Affiliates still active.
    pub active_participants: usize,
    /// Distinct courses with at least one enrollment in progress.
    pub live_courses: usize,
    /// Enrollments marked completed.
    pub completed_enrollments: usize,
}

/// Company with every affiliate and their enrollments.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyOverview {
    /// Company document.
    pub company: Company,
    /// Affiliates with resolved enrollments.
    pub participants: Vec<AffiliateView>,
    /// Headline numbers.
    pub statistics: OverviewStatistics,
}

/// Enrollment totals for a company.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyStatistics {
    /// Company id.
    pub company_id: CompanyId,
    /// Company name.
    pub company_name: String,
    /// Affiliates found.
    pub total_participants: usize,
    /// Affiliates still active.
    pub active_participants: usize,
    /// Every enrollment record.
    pub total_enrollments: usize,
    /// Records with status enrolled.
    pub enrolled: usize,
    /// Records with status completed.
    pub completed: usize,
    /// Records with status withdrawn.
    pub withdrawn: usize,
    /// Distinct courses ever taken.
    pub distinct_courses: usize,
    /// completed / enrolled x 100, two decimals; 0 without enrollments.
    pub completion_rate: f64,
}

/// Per-course totals for a company's affiliates.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseStatisticsLine {
    /// Course id.
    pub course_id: CourseId,
    /// Course name, `null` when the course no longer exists.
    pub course_name: Option<String>,
    /// Records for this course.
    pub total: usize,
    /// Records with status enrolled.
    pub enrolled: usize,
    /// Records with status completed.
    pub completed: usize,
    /// Records with status withdrawn.
    pub withdrawn: usize,
    /// Mean of recorded scores, two decimals; `null` when none are graded.
    pub average_score: Option<f64>,
}

/// Per-course statistics for a company.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseStatistics {
    /// Company id.
    pub company_id: CompanyId,
    /// One line per course referenced by any affiliate.
    pub courses: Vec<CourseStatisticsLine>,
}

/// One affiliate's enrollment within a course group.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseParticipant {
    /// Participant id.
    pub participant_id: ParticipantId,
    /// Full name.
    pub name: String,
    /// Email.
    pub email: String,
    /// Enrollment status.
    pub status: EnrollmentStatus,
    /// Seat timestamp.
    pub enrolled_at: DateTime<Utc>,
    /// Score, when graded.
    pub score: Option<f64>,
}

/// Affiliates grouped under one course.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseGroup {
    /// Course id.
    pub course_id: CourseId,
    /// Resolved course, `null` when it no longer exists.
    pub course: Option<CourseSummary>,
    /// Affiliates enrolled in it.
    pub participants: Vec<CourseParticipant>,
}

/// A company's affiliates grouped by course.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsByCourse {
    /// Company id.
    pub company_id: CompanyId,
    /// Groups ordered by course name.
    pub courses: Vec<CourseGroup>,
}

/// One line of the company listing.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    /// Company id.
    pub company_id: CompanyId,
    /// Company name.
    pub name: String,
    /// Federal tax id.
    pub tax_id: String,
    /// Municipality.
    pub municipality: String,
    /// Operating state.
    pub status: CompanyStatus,
    /// Affiliates found.
    pub total_participants: usize,
    /// Affiliates still active.
    pub active_participants: usize,
    /// Distinct courses with at least one enrollment in progress.
    pub live_courses: usize,
}

/// One roster line with the participant resolved.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RosterLine {
    /// Participant id.
    pub participant_id: ParticipantId,
    /// Full name, `null` when the participant no longer exists.
    pub name: Option<String>,
    /// Company name copied onto the participant.
    pub company_name: Option<String>,
    /// Mirrored status.
    pub status: EnrollmentStatus,
    /// Seat timestamp.
    pub enrolled_at: DateTime<Utc>,
}

/// Course roster with capacity numbers.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseRoster {
    /// Course description.
    pub course: CourseSummary,
    /// Seat limit.
    pub cupo_maximo: u32,
    /// Seats taken.
    pub live_count: usize,
    /// Seats free.
    pub seats_left: usize,
    /// Every roster entry.
    pub entries: Vec<RosterLine>,
}

/// Denormalised views over the three stores.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrainingReadModel: Send + Sync {
    /// Company plus affiliates and their enrollments.
    async fn company_overview(&self, company_id: CompanyId) -> Result<CompanyOverview, TrainingError>;

    /// Enrollment totals for a company.
    async fn company_statistics(
        &self,
        company_id: CompanyId,
    ) -> Result<CompanyStatistics, TrainingError>;

    /// Per-course totals for a company.
    async fn course_statistics(&self, company_id: CompanyId) -> Result<CourseStatistics, TrainingError>;

    /// Affiliates grouped by course.
    async fn participants_by_course(
        &self,
        company_id: CompanyId,
    ) -> Result<ParticipantsByCourse, TrainingError>;

    /// Every company with participant counts.
    async fn companies_summary(&self) -> Result<Vec<CompanySummary>, TrainingError>;

    /// Roster of one course.
    async fn course_roster(&self, course_id: CourseId) -> Result<CourseRoster, TrainingError>;
}
