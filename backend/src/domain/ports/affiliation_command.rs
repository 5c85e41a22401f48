//! Driving port for company affiliation mutations.

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{AggregateKind, CompanyId, CompanyName, ParticipantId, TrainingError};

/// Result of affiliate or detach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AffiliationOutcome {
    /// Company.
    pub company_id: CompanyId,
    /// Participant.
    pub participant_id: ParticipantId,
    /// `false` when both sides already agreed.
    pub changed: bool,
    /// Side that was written to repair a one-sided link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repaired: Option<AggregateKind>,
}

/// Result of a company rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenameOutcome {
    /// Company.
    pub company_id: CompanyId,
    /// Name now stored on the company.
    pub name: String,
    /// Participants whose denormalised name was refreshed.
    pub participants_updated: usize,
    /// Set when the refresh failed; participants show the old name until the
    /// rename is retried.
    pub stale_links: bool,
}

/// Affiliation use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AffiliationCommand: Send + Sync {
    /// Link a participant to a company.
    async fn affiliate(
        &self,
        company_id: CompanyId,
        participant_id: ParticipantId,
    ) -> Result<AffiliationOutcome, TrainingError>;

    /// Remove the link between a participant and a company.
    async fn detach(
        &self,
        company_id: CompanyId,
        participant_id: ParticipantId,
    ) -> Result<AffiliationOutcome, TrainingError>;

    /// Rename a company and refresh the name copied onto its participants.
    async fn rename_company(
        &self,
        company_id: CompanyId,
        name: CompanyName,
    ) -> Result<RenameOutcome, TrainingError>;

    /// Delete a company that no participant references.
    async fn delete_company(&self, company_id: CompanyId) -> Result<(), TrainingError>;
}
