//! Driving ports for single-document CRUD on the three collections.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    Certificate, Company, CompanyId, CompanyName, CompanyProfile, CompanyStatus, Course,
    CourseDetails, CourseId, Participant, ParticipantId, ParticipantProfile, ParticipantStatus,
    TrainingError,
};

/// Data for a new participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewParticipant {
    /// Profile data.
    pub profile: ParticipantProfile,
    /// Company to affiliate with right after creation.
    pub company_id: Option<CompanyId>,
}

/// Data for a new company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCompany {
    /// Company name.
    pub name: CompanyName,
    /// Profile data.
    pub profile: CompanyProfile,
}

/// Replacement data for an existing company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyUpdate {
    /// Desired name; a change is propagated to participants.
    pub name: CompanyName,
    /// Profile data.
    pub profile: CompanyProfile,
    /// Operating state.
    pub status: CompanyStatus,
}

/// Company after an update, with the outcome of the name refresh on its
/// participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyUpdated {
    /// Stored company.
    #[serde(flatten)]
    pub company: Company,
    /// Participants whose denormalised name was rewritten.
    pub participants_updated: usize,
    /// Set when participants still carry an older name; repeating the
    /// update repairs them.
    pub stale_links: bool,
}

/// Certificate metadata produced by the upload collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateUpload {
    /// Storage identifier.
    pub public_id: String,
    /// Download location.
    pub url: String,
    /// Original file name.
    pub file_name: String,
    /// Optional category label.
    pub category: Option<String>,
    /// Upload time reported by the collaborator; defaults to now.
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Write use-cases for courses, participants, companies and certificates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistryCommand: Send + Sync {
    /// Create a course with an empty roster.
    async fn create_course(&self, details: CourseDetails) -> Result<Course, TrainingError>;

    /// Replace a course's descriptive details.
    async fn update_course(
        &self,
        course_id: CourseId,
        details: CourseDetails,
    ) -> Result<Course, TrainingError>;

    /// Create a participant, optionally affiliating it.
    async fn create_participant(&self, new: NewParticipant) -> Result<Participant, TrainingError>;

    /// Replace a participant's profile.
    async fn update_participant(
        &self,
        participant_id: ParticipantId,
        profile: ParticipantProfile,
    ) -> Result<Participant, TrainingError>;

    /// Attach certificate metadata to a participant.
    async fn attach_certificate(
        &self,
        participant_id: ParticipantId,
        upload: CertificateUpload,
    ) -> Result<Certificate, TrainingError>;

    /// Revoke a participant's certificate.
    async fn revoke_certificate(
        &self,
        participant_id: ParticipantId,
        public_id: String,
    ) -> Result<Certificate, TrainingError>;

    /// Register a company under a unique tax id.
    async fn register_company(&self, new: NewCompany) -> Result<Company, TrainingError>;

    /// Replace a company's data and refresh its name on every participant.
    async fn update_company(
        &self,
        company_id: CompanyId,
        update: CompanyUpdate,
    ) -> Result<CompanyUpdated, TrainingError>;
}

/// Read use-cases for single documents and plain listings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistryQuery: Send + Sync {
    /// Fetch one course.
    async fn get_course(&self, course_id: CourseId) -> Result<Course, TrainingError>;

    /// Every course.
    async fn list_courses(&self) -> Result<Vec<Course>, TrainingError>;

    /// Fetch one participant.
    async fn get_participant(
        &self,
        participant_id: ParticipantId,
    ) -> Result<Participant, TrainingError>;

    /// Participants, optionally filtered by status.
    async fn list_participants(
        &self,
        status: Option<ParticipantStatus>,
    ) -> Result<Vec<Participant>, TrainingError>;

    /// Deactivated participants, most recently deactivated first.
    async fn participant_history(&self) -> Result<Vec<Participant>, TrainingError>;

    /// Fetch one company.
    async fn get_company(&self, company_id: CompanyId) -> Result<Company, TrainingError>;

    /// Every company.
    async fn list_companies(&self) -> Result<Vec<Company>, TrainingError>;
}
