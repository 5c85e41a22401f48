//! Participant lifecycle: soft delete with a best-effort cascade and hard
//! delete guarded by a complete one.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::mirrors::{MirrorContext, record};
use crate::domain::ports::{
    CompanyRepository, CourseRepository, DeactivationReport, LifecycleCommand,
    ParticipantRepository,
};
use crate::domain::{
    AffiliateStatus, AggregateKind, AggregateRef, CascadeReport, CourseId, EnrollmentStatus,
    Participant, ParticipantId, TrainingError, TrainingStores, retry_stale,
};

use super::enrollment_coordinator::DEFAULT_RETRY_LIMIT;

/// Implements [`LifecycleCommand`].
pub struct LifecycleManager<C: ?Sized, P: ?Sized, K: ?Sized> {
    stores: TrainingStores<C, P, K>,
    clock: Arc<dyn Clock>,
    retry_limit: u32,
}

impl<C: ?Sized, P: ?Sized, K: ?Sized> LifecycleManager<C, P, K> {
    /// Create a manager.
    pub fn new(stores: TrainingStores<C, P, K>, clock: Arc<dyn Clock>) -> Self {
        Self {
            stores,
            clock,
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }

    /// Override the optimistic retry limit.
    #[must_use]
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    fn mirrors(&self) -> MirrorContext<'_, C, P, K> {
        MirrorContext {
            stores: &self.stores,
            now: self.clock.utc(),
            retry_limit: self.retry_limit,
        }
    }
}

impl<C, P, K> LifecycleManager<C, P, K>
where
    C: CourseRepository + ?Sized,
    P: ParticipantRepository + ?Sized,
    K: CompanyRepository + ?Sized,
{
    async fn deactivate_once(
        &self,
        participant_id: ParticipantId,
    ) -> Result<(Participant, Vec<CourseId>), TrainingError> {
        let mut participant = self.stores.load_participant(&participant_id).await?;
        if !participant.is_active() {
            return Err(TrainingError::AlreadyInactive { participant_id });
        }
        let now = self.clock.utc();
        let withdrawn = participant.deactivate(now);
        let expected = participant.advance(now);
        self.stores
            .save_participant(&participant, Some(expected))
            .await?;
        Ok((participant, withdrawn))
    }
}

fn course_ref(course_id: CourseId) -> AggregateRef {
    AggregateRef::new(AggregateKind::Course, *course_id.as_uuid())
}

#[async_trait]
impl<C, P, K> LifecycleCommand for LifecycleManager<C, P, K>
where
    C: CourseRepository + ?Sized,
    P: ParticipantRepository + ?Sized,
    K: CompanyRepository + ?Sized,
{
    async fn deactivate_participant(
        &self,
        participant_id: ParticipantId,
    ) -> Result<DeactivationReport, TrainingError> {
        let (participant, withdrawn) = retry_stale(self.retry_limit, "deactivate", move || {
            self.deactivate_once(participant_id)
        })
        .await?;

        let parent = participant.reference();
        let mirrors = self.mirrors();
        let mut cascade = CascadeReport::default();
        if let Some(link) = participant.company() {
            let company_id = link.company_id;
            let result = mirrors
                .update_company(company_id, |company| {
                    company.set_affiliate_status(&participant_id, AffiliateStatus::Inactive)
                })
                .await;
            record(
                &mut cascade,
                parent,
                AggregateRef::new(AggregateKind::Company, *company_id.as_uuid()),
                result,
            );
        }
        for course_id in withdrawn {
            let result = mirrors
                .update_course(course_id, |course| {
                    course.set_roster_status(&participant_id, EnrollmentStatus::Withdrawn)
                })
                .await;
            record(&mut cascade, parent, course_ref(course_id), result);
        }

        if cascade.is_complete() {
            info!(%participant_id, mirrors = cascade.updated_count(), "participant deactivated");
        } else {
            warn!(
                %participant_id,
                failed = cascade.failures().count(),
                "participant deactivated with incomplete cascade"
            );
        }
        Ok(DeactivationReport {
            participant,
            cascade,
        })
    }

    async fn delete_participant(
        &self,
        participant_id: ParticipantId,
    ) -> Result<CascadeReport, TrainingError> {
        let participant = self.stores.load_participant(&participant_id).await?;
        let parent = participant.reference();
        let mirrors = self.mirrors();
        let mut report = CascadeReport::default();

        if let Some(link) = participant.company() {
            let company_id = link.company_id;
            let result = mirrors
                .update_company(company_id, |company| company.remove_affiliate(&participant_id))
                .await;
            record(
                &mut report,
                parent,
                AggregateRef::new(AggregateKind::Company, *company_id.as_uuid()),
                result,
            );
        }
        for enrollment in participant.enrollments() {
            let course_id = enrollment.course_id;
            let result = mirrors
                .update_course(course_id, |course| course.remove_from_roster(&participant_id))
                .await;
            record(&mut report, parent, course_ref(course_id), result);
        }

        if !report.is_complete() {
            return Err(TrainingError::CascadeIncomplete { parent, report });
        }
        self.stores.delete_participant(&participant_id).await?;
        info!(%participant_id, mirrors = report.updated_count(), "participant deleted");
        Ok(report)
    }
}

#[cfg(test)]
#[path = "lifecycle_manager_tests.rs"]
mod tests;
