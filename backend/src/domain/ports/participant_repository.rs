//! Driven port for the participant document store.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::{CompanyId, CourseId, EmailAddress, Participant, ParticipantId};

/// Persistence port for [`Participant`] documents.
///
/// `save` follows the same compare-and-set contract as
/// [`CourseRepository::save`](super::CourseRepository::save).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    /// Fetch a participant by id.
    async fn find_by_id(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError>;

    /// Fetch the participant registered under `email`.
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Participant>, StoreError>;

    /// Every participant, oldest first.
    async fn list(&self) -> Result<Vec<Participant>, StoreError>;

    /// Participants whose company link points at `company_id`.
    async fn list_by_company(&self, company_id: &CompanyId) -> Result<Vec<Participant>, StoreError>;

    /// Participants holding any enrollment record for `course_id`.
    async fn list_enrolled_in(&self, course_id: &CourseId) -> Result<Vec<Participant>, StoreError>;

    /// Insert or revision-checked update.
    async fn save(
        &self,
        participant: &Participant,
        expected_revision: Option<u32>,
    ) -> Result<(), StoreError>;

    /// Rewrite the denormalised company name on every participant linked to
    /// `company_id`. Returns how many documents changed. Each document's
    /// revision is bumped.
    async fn rename_company(&self, company_id: &CompanyId, name: &str) -> Result<usize, StoreError>;

    /// Remove a participant. Returns `false` when it did not exist.
    async fn delete(&self, id: &ParticipantId) -> Result<bool, StoreError>;
}
