//! Participant aggregate: profile, company link, enrollments and certificates.
//!
//! The participant holds the authoritative enrollment record. The company link
//! pairs the reference with a denormalised copy of the company name so a
//! participant can never carry a name without a reference or vice versa.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    AggregateKind, AggregateRef, CompanyId, CourseId, Curp, EmailAddress, Enrollment,
    EnrollmentStatus, ParticipantId, Score,
};

/// Minimum participant age.
pub const MIN_AGE: u8 = 18;
/// Maximum participant age.
pub const MAX_AGE: u8 = 100;

/// Participant account state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    /// May enroll in courses.
    Active,
    /// Soft-deleted; history is retained.
    Inactive,
}

/// Validation failures for participant profiles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParticipantValidationError {
    /// A required text field was blank.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Offending field.
        field: &'static str,
    },
    /// Age outside the accepted range.
    #[error("age must be between 18 and 100, got {0}")]
    AgeOutOfRange(u8),
}

/// Denormalised link to the owning company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyLink {
    /// Owning company.
    pub company_id: CompanyId,
    /// Company name at the time of the last affiliation or rename.
    pub company_name: String,
}

/// Admin-editable participant data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantProfile {
    /// Full name.
    pub name: String,
    /// Job title.
    pub position: String,
    /// Age in years.
    pub age: u8,
    /// Unique contact email.
    pub email: EmailAddress,
    /// Contact phone.
    pub phone: String,
    /// National population registry key.
    pub curp: Curp,
}

impl ParticipantProfile {
    /// Check field-level rules.
    pub fn validate(&self) -> Result<(), ParticipantValidationError> {
        for (field, value) in [
            ("name", &self.name),
            ("position", &self.position),
            ("phone", &self.phone),
        ] {
            if value.trim().is_empty() {
                return Err(ParticipantValidationError::EmptyField { field });
            }
        }
        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            return Err(ParticipantValidationError::AgeOutOfRange(self.age));
        }
        Ok(())
    }
}

/// Whether an uploaded certificate is still valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    /// Valid certificate.
    Active,
    /// Withdrawn by an administrator.
    Revoked,
}

/// Certificate metadata; the file itself lives in external storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// Storage identifier, unique per participant.
    pub public_id: String,
    /// Download location.
    pub url: String,
    /// Original file name.
    pub file_name: String,
    /// Free-form category, e.g. constancia or diploma.
    #[serde(default)]
    pub category: Option<String>,
    /// Upload time.
    pub uploaded_at: DateTime<Utc>,
    /// Validity.
    pub status: CertificateStatus,
}

/// Participant aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    id: ParticipantId,
    profile: ParticipantProfile,
    #[serde(default)]
    company: Option<CompanyLink>,
    status: ParticipantStatus,
    #[serde(default)]
    deactivated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    enrollments: Vec<Enrollment>,
    #[serde(default)]
    certificates: Vec<Certificate>,
    revision: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Participant {
    /// Create a new, unsaved, active participant at revision 1.
    pub fn create(
        id: ParticipantId,
        profile: ParticipantProfile,
        now: DateTime<Utc>,
    ) -> Result<Self, ParticipantValidationError> {
        profile.validate()?;
        Ok(Self {
            id,
            profile,
            company: None,
            status: ParticipantStatus::Active,
            deactivated_at: None,
            enrollments: Vec::new(),
            certificates: Vec::new(),
            revision: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Identifier.
    pub const fn id(&self) -> ParticipantId {
        self.id
    }

    /// Reference used in error reports.
    pub fn reference(&self) -> AggregateRef {
        AggregateRef::new(AggregateKind::Participant, *self.id.as_uuid())
    }

    /// Profile data.
    pub const fn profile(&self) -> &ParticipantProfile {
        &self.profile
    }

    /// Company link, when affiliated.
    pub const fn company(&self) -> Option<&CompanyLink> {
        self.company.as_ref()
    }

    /// Account state.
    pub const fn status(&self) -> ParticipantStatus {
        self.status
    }

    /// Whether the participant may enroll.
    pub fn is_active(&self) -> bool {
        self.status == ParticipantStatus::Active
    }

    /// When the participant was soft-deleted.
    pub const fn deactivated_at(&self) -> Option<DateTime<Utc>> {
        self.deactivated_at
    }

    /// Every enrollment record including withdrawn ones.
    pub fn enrollments(&self) -> &[Enrollment] {
        &self.enrollments
    }

    /// Attached certificates.
    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    /// Stored revision.
    pub const fn revision(&self) -> u32 {
        self.revision
    }

    /// Creation timestamp.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last write timestamp.
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Enrollment record for `course_id`, live or not.
    pub fn enrollment(&self, course_id: &CourseId) -> Option<&Enrollment> {
        self.enrollments
            .iter()
            .find(|enrollment| enrollment.course_id == *course_id)
    }

    fn enrollment_mut(&mut self, course_id: &CourseId) -> Option<&mut Enrollment> {
        self.enrollments
            .iter_mut()
            .find(|enrollment| enrollment.course_id == *course_id)
    }

    /// Whether the participant holds a live enrollment in `course_id`.
    pub fn has_live_enrollment(&self, course_id: &CourseId) -> bool {
        self.enrollment(course_id).is_some_and(Enrollment::is_live)
    }

    /// Live enrollments.
    pub fn live_enrollments(&self) -> impl Iterator<Item = &Enrollment> {
        self.enrollments.iter().filter(|enrollment| enrollment.is_live())
    }

    /// Record an enrollment. A previous withdrawn record for the same course is
    /// reused: status, timestamp, score and notes start over.
    pub fn enroll(&mut self, course_id: CourseId, enrolled_at: DateTime<Utc>) {
        match self.enrollment_mut(&course_id) {
            Some(existing) => *existing = Enrollment::new(course_id, enrolled_at),
            None => self.enrollments.push(Enrollment::new(course_id, enrolled_at)),
        }
    }

    /// Flip a live enrollment to withdrawn. Returns `false` when there was no
    /// live enrollment.
    pub fn withdraw(&mut self, course_id: &CourseId) -> bool {
        match self.enrollment_mut(course_id) {
            Some(enrollment) if enrollment.is_live() => {
                enrollment.status = EnrollmentStatus::Withdrawn;
                true
            }
            _ => false,
        }
    }

    /// Update status, score and notes of an existing enrollment. `None` keeps
    /// the stored score or notes. Returns the updated record, or `None` when
    /// the participant never enrolled in `course_id`.
    pub fn grade(
        &mut self,
        course_id: &CourseId,
        status: EnrollmentStatus,
        score: Option<Score>,
        notes: Option<String>,
    ) -> Option<&Enrollment> {
        let enrollment = self.enrollment_mut(course_id)?;
        enrollment.status = status;
        if score.is_some() {
            enrollment.score = score;
        }
        if notes.is_some() {
            enrollment.notes = notes;
        }
        Some(enrollment)
    }

    /// Remove the live enrollment for `course_id`. Historical (withdrawn)
    /// records are kept.
    pub fn strip_live_enrollment(&mut self, course_id: &CourseId) -> bool {
        let before = self.enrollments.len();
        self.enrollments
            .retain(|enrollment| !(enrollment.course_id == *course_id && enrollment.is_live()));
        self.enrollments.len() != before
    }

    /// Set the company link.
    pub fn link_company(&mut self, link: CompanyLink) {
        self.company = Some(link);
    }

    /// Clear the company link, returning the previous one.
    pub fn unlink_company(&mut self) -> Option<CompanyLink> {
        self.company.take()
    }

    /// Refresh the denormalised company name. Returns `false` when the
    /// participant is not linked to `company_id` or the name is current.
    pub fn rename_company(&mut self, company_id: &CompanyId, name: &str) -> bool {
        match self.company.as_mut() {
            Some(link) if link.company_id == *company_id && link.company_name != name => {
                name.clone_into(&mut link.company_name);
                true
            }
            _ => false,
        }
    }

    /// Replace the profile.
    pub fn revise(&mut self, profile: ParticipantProfile) -> Result<(), ParticipantValidationError> {
        profile.validate()?;
        self.profile = profile;
        Ok(())
    }

    /// Soft-delete: mark inactive and withdraw every live enrollment. Returns
    /// the courses whose enrollment was withdrawn.
    pub fn deactivate(&mut self, now: DateTime<Utc>) -> Vec<CourseId> {
        self.status = ParticipantStatus::Inactive;
        self.deactivated_at = Some(now);
        self.enrollments
            .iter_mut()
            .filter(|enrollment| enrollment.is_live())
            .map(|enrollment| {
                enrollment.status = EnrollmentStatus::Withdrawn;
                enrollment.course_id
            })
            .collect()
    }

    /// Attach certificate metadata. Re-uploading the same `public_id` replaces
    /// the previous metadata.
    pub fn attach_certificate(&mut self, certificate: Certificate) {
        self.certificates
            .retain(|existing| existing.public_id != certificate.public_id);
        self.certificates.push(certificate);
    }

    /// Mark a certificate revoked. Returns the updated certificate, or `None`
    /// when `public_id` is unknown.
    pub fn revoke_certificate(&mut self, public_id: &str) -> Option<&Certificate> {
        let certificate = self
            .certificates
            .iter_mut()
            .find(|certificate| certificate.public_id == public_id)?;
        certificate.status = CertificateStatus::Revoked;
        Some(certificate)
    }

    /// Stamp a modification and return the revision the store must still hold.
    pub fn advance(&mut self, now: DateTime<Utc>) -> u32 {
        let expected = self.revision;
        self.revision = self.revision.saturating_add(1);
        self.updated_at = now;
        expected
    }
}
