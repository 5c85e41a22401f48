//! Driving port for participant lifecycle transitions.

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{CascadeReport, Participant, ParticipantId, TrainingError};

/// Result of a soft delete.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeactivationReport {
    /// Participant as stored after deactivation.
    pub participant: Participant,
    /// Best-effort updates of the company and course mirrors.
    pub cascade: CascadeReport,
}

/// Participant lifecycle use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LifecycleCommand: Send + Sync {
    /// Soft delete: mark inactive and withdraw every live enrollment.
    async fn deactivate_participant(
        &self,
        participant_id: ParticipantId,
    ) -> Result<DeactivationReport, TrainingError>;

    /// Hard delete: remove every mirror entry first, then the participant.
    async fn delete_participant(
        &self,
        participant_id: ParticipantId,
    ) -> Result<CascadeReport, TrainingError>;
}
