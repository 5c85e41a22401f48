//! Reload, mutate and compare-and-set helpers for mirror updates.
//!
//! The second write of a two-sided operation and every cascade entry go
//! through these helpers. Each attempt re-reads the document, so a
//! concurrent writer costs a retry rather than a divergence.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::ports::{CompanyRepository, CourseRepository, ParticipantRepository};
use crate::domain::{
    AggregateRef, CascadeReport, Company, CompanyId, Course, CourseId, Participant,
    ParticipantId, TrainingError, TrainingStores, retry_stale,
};

/// What a mirror update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mirror {
    /// The document no longer exists.
    Missing,
    /// The document already held the desired state.
    Unchanged,
    /// The document was rewritten.
    Updated,
}

/// Shared arguments of every mirror update.
pub(crate) struct MirrorContext<'a, C: ?Sized, P: ?Sized, K: ?Sized> {
    pub stores: &'a TrainingStores<C, P, K>,
    pub now: DateTime<Utc>,
    pub retry_limit: u32,
}

impl<C: ?Sized, P: ?Sized, K: ?Sized> Clone for MirrorContext<'_, C, P, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: ?Sized, P: ?Sized, K: ?Sized> Copy for MirrorContext<'_, C, P, K> {}

impl<C, P, K> MirrorContext<'_, C, P, K>
where
    C: CourseRepository + ?Sized,
    P: ParticipantRepository + ?Sized,
    K: CompanyRepository + ?Sized,
{
    /// Apply `mutate` to the stored course; `mutate` returns whether it
    /// changed anything.
    pub(crate) async fn update_course<F>(
        self,
        course_id: CourseId,
        mutate: F,
    ) -> Result<Mirror, TrainingError>
    where
        F: Fn(&mut Course) -> bool + Sync,
    {
        let mutate = &mutate;
        retry_stale(self.retry_limit, "course.mirror", move || async move {
            let Some(mut course) = self.stores.find_course(&course_id).await? else {
                return Ok(Mirror::Missing);
            };
            if !mutate(&mut course) {
                return Ok(Mirror::Unchanged);
            }
            let expected = course.advance(self.now);
            self.stores.save_course(&course, Some(expected)).await?;
            Ok(Mirror::Updated)
        })
        .await
    }

    /// Apply `mutate` to the stored participant.
    pub(crate) async fn update_participant<F>(
        self,
        participant_id: ParticipantId,
        mutate: F,
    ) -> Result<Mirror, TrainingError>
    where
        F: Fn(&mut Participant) -> bool + Sync,
    {
        let mutate = &mutate;
        retry_stale(self.retry_limit, "participant.mirror", move || async move {
            let Some(mut participant) = self.stores.find_participant(&participant_id).await? else {
                return Ok(Mirror::Missing);
            };
            if !mutate(&mut participant) {
                return Ok(Mirror::Unchanged);
            }
            let expected = participant.advance(self.now);
            self.stores
                .save_participant(&participant, Some(expected))
                .await?;
            Ok(Mirror::Updated)
        })
        .await
    }

    /// Apply `mutate` to the stored company.
    pub(crate) async fn update_company<F>(
        self,
        company_id: CompanyId,
        mutate: F,
    ) -> Result<Mirror, TrainingError>
    where
        F: Fn(&mut Company) -> bool + Sync,
    {
        let mutate = &mutate;
        retry_stale(self.retry_limit, "company.mirror", move || async move {
            let Some(mut company) = self.stores.find_company(&company_id).await? else {
                return Ok(Mirror::Missing);
            };
            if !mutate(&mut company) {
                return Ok(Mirror::Unchanged);
            }
            let expected = company.advance(self.now);
            self.stores.save_company(&company, Some(expected)).await?;
            Ok(Mirror::Updated)
        })
        .await
    }
}

/// Record one cascade entry, logging failures.
pub(crate) fn record(
    report: &mut CascadeReport,
    parent: AggregateRef,
    target: AggregateRef,
    result: Result<Mirror, TrainingError>,
) {
    match result {
        Ok(Mirror::Updated) => report.updated(target),
        Ok(Mirror::Unchanged | Mirror::Missing) => report.unchanged(target),
        Err(err) => {
            warn!(%parent, %target, error = %err, "cascade update failed");
            report.failed(target, err.to_string());
        }
    }
}
