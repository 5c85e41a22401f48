//! Enrollment coordinator: keeps course rosters and participant enrollment
//! lists in step.
//!
//! Write order is fixed. Enroll and withdraw write the course first and the
//! participant second; status updates write the participant first and mirror
//! onto the course. When the second write fails the operation returns
//! [`TrainingError::PartialWriteFailure`]; calling it again detects the side
//! that is ahead and only writes the side that is behind.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info};

use crate::domain::mirrors::{Mirror, MirrorContext, record};
use crate::domain::ports::{
    CompanyRepository, CourseRepository, EnrollmentCommand, EnrollmentOutcome, EnrollmentRequest,
    EnrollmentStatusUpdate, ParticipantRepository, WithdrawalOutcome,
};
use crate::domain::{
    AggregateKind, AggregateRef, CascadeReport, CourseId, Enrollment, EnrollmentStatus, TrainingError,
    TrainingStores, retry_stale,
};

/// Optimistic retries before a revision conflict is reported.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Implements [`EnrollmentCommand`] over the three stores.
pub struct EnrollmentCoordinator<C: ?Sized, P: ?Sized, K: ?Sized> {
    stores: TrainingStores<C, P, K>,
    clock: Arc<dyn Clock>,
    retry_limit: u32,
}

impl<C: ?Sized, P: ?Sized, K: ?Sized> EnrollmentCoordinator<C, P, K> {
    /// Create a coordinator.
    pub fn new(stores: TrainingStores<C, P, K>, clock: Arc<dyn Clock>) -> Self {
        Self {
            stores,
            clock,
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }

    /// Override how often a revision conflict on the first write is retried.
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

impl<C, P, K> EnrollmentCoordinator<C, P, K>
where
    C: CourseRepository + ?Sized,
    P: ParticipantRepository + ?Sized,
    K: CompanyRepository + ?Sized,
{
    async fn enroll_once(
        &self,
        request: EnrollmentRequest,
    ) -> Result<EnrollmentOutcome, TrainingError> {
        let EnrollmentRequest {
            participant_id,
            course_id,
        } = request;
        let mut course = self.stores.load_course(&course_id).await?;
        let mut participant = self.stores.load_participant(&participant_id).await?;
        if !participant.is_active() {
            return Err(TrainingError::ParticipantInactive { participant_id });
        }

        let now = self.clock.utc();
        let outcome = |enrolled_at, repaired| EnrollmentOutcome {
            participant_id,
            course_id,
            enrolled_at,
            repaired,
        };

        let seated_at = course
            .roster_entry(&participant_id)
            .filter(|entry| entry.is_live())
            .map(|entry| entry.enrolled_at);
        match (seated_at, participant.has_live_enrollment(&course_id)) {
            (Some(_), true) => Err(TrainingError::AlreadyEnrolled {
                participant_id,
                course_id,
            }),
            (Some(enrolled_at), false) => {
                participant.enroll(course_id, enrolled_at);
                let expected = participant.advance(now);
                self.stores
                    .save_participant(&participant, Some(expected))
                    .await?;
                info!(%participant_id, %course_id, "repaired participant side of enrollment");
                Ok(outcome(enrolled_at, Some(AggregateKind::Participant)))
            }
            (None, true) => {
                if !course.has_seat() {
                    return Err(capacity_exceeded(course_id, course.details().maximum_capacity));
                }
                let enrolled_at = participant
                    .enrollment(&course_id)
                    .map_or(now, |enrollment| enrollment.enrolled_at);
                course.admit(participant_id, enrolled_at);
                let expected = course.advance(now);
                self.stores.save_course(&course, Some(expected)).await?;
                info!(%participant_id, %course_id, "repaired course side of enrollment");
                Ok(outcome(enrolled_at, Some(AggregateKind::Course)))
            }
            (None, false) => {
                if !course.has_seat() {
                    return Err(capacity_exceeded(course_id, course.details().maximum_capacity));
                }
                course.admit(participant_id, now);
                let expected = course.advance(now);
                self.stores.save_course(&course, Some(expected)).await?;

                let behind = participant.reference();
                self.mirrors()
                    .update_participant(participant_id, |stored| {
                        if stored.has_live_enrollment(&course_id) {
                            return false;
                        }
                        stored.enroll(course_id, now);
                        true
                    })
                    .await
                    .and_then(|mirror| match mirror {
                        Mirror::Missing => Err(TrainingError::participant_not_found(participant_id)),
                        Mirror::Unchanged | Mirror::Updated => Ok(()),
                    })
                    .map_err(|err| TrainingError::diverged(course.reference(), behind, &err))?;
                info!(%participant_id, %course_id, "participant enrolled");
                Ok(outcome(now, None))
            }
        }
    }

    async fn withdraw_once(
        &self,
        request: EnrollmentRequest,
    ) -> Result<WithdrawalOutcome, TrainingError> {
        let EnrollmentRequest {
            participant_id,
            course_id,
        } = request;
        let mut course = self.stores.load_course(&course_id).await?;
        let mut participant = self.stores.load_participant(&participant_id).await?;
        let now = self.clock.utc();
        let outcome = |repaired| WithdrawalOutcome {
            participant_id,
            course_id,
            repaired,
        };

        match (
            course.has_live_entry(&participant_id),
            participant.has_live_enrollment(&course_id),
        ) {
            (false, false) => Err(TrainingError::NotEnrolled {
                participant_id,
                course_id,
            }),
            (true, true) => {
                course.set_roster_status(&participant_id, EnrollmentStatus::Withdrawn);
                let expected = course.advance(now);
                self.stores.save_course(&course, Some(expected)).await?;

                let behind = participant.reference();
                self.mirrors()
                    .update_participant(participant_id, |stored| stored.withdraw(&course_id))
                    .await
                    .map_err(|err| TrainingError::diverged(course.reference(), behind, &err))?;
                info!(%participant_id, %course_id, "participant withdrawn");
                Ok(outcome(None))
            }
            (true, false) => {
                course.set_roster_status(&participant_id, EnrollmentStatus::Withdrawn);
                let expected = course.advance(now);
                self.stores.save_course(&course, Some(expected)).await?;
                info!(%participant_id, %course_id, "withdrew one-sided course entry");
                Ok(outcome(Some(AggregateKind::Course)))
            }
            (false, true) => {
                participant.withdraw(&course_id);
                let expected = participant.advance(now);
                self.stores
                    .save_participant(&participant, Some(expected))
                    .await?;
                info!(%participant_id, %course_id, "withdrew one-sided participant enrollment");
                Ok(outcome(Some(AggregateKind::Participant)))
            }
        }
    }

    async fn grade_once(&self, update: &EnrollmentStatusUpdate) -> Result<Enrollment, TrainingError> {
        let mut participant = self.stores.load_participant(&update.participant_id).await?;
        let current = participant
            .enrollment(&update.course_id)
            .ok_or(TrainingError::NotEnrolled {
                participant_id: update.participant_id,
                course_id: update.course_id,
            })?;
        if !current.is_live() && update.status.is_live() {
            return Err(TrainingError::validation(
                "a withdrawn enrollment must be re-activated through enroll",
            ));
        }

        let enrollment = participant
            .grade(
                &update.course_id,
                update.status,
                update.score,
                update.notes.clone(),
            )
            .cloned()
            .ok_or(TrainingError::NotEnrolled {
                participant_id: update.participant_id,
                course_id: update.course_id,
            })?;
        let expected = participant.advance(self.clock.utc());
        self.stores
            .save_participant(&participant, Some(expected))
            .await?;
        Ok(enrollment)
    }
}

fn capacity_exceeded(course_id: CourseId, maximum: u32) -> TrainingError {
    TrainingError::CapacityExceeded { course_id, maximum }
}

#[async_trait]
impl<C, P, K> EnrollmentCommand for EnrollmentCoordinator<C, P, K>
where
    C: CourseRepository + ?Sized,
    P: ParticipantRepository + ?Sized,
    K: CompanyRepository + ?Sized,
{
    async fn enroll(&self, request: EnrollmentRequest) -> Result<EnrollmentOutcome, TrainingError> {
        retry_stale(self.retry_limit, "enroll", move || self.enroll_once(request)).await
    }

    async fn withdraw(&self, request: EnrollmentRequest) -> Result<WithdrawalOutcome, TrainingError> {
        retry_stale(self.retry_limit, "withdraw", move || self.withdraw_once(request)).await
    }

    async fn set_enrollment_status(
        &self,
        update: EnrollmentStatusUpdate,
    ) -> Result<Enrollment, TrainingError> {
        let update = &update;
        let enrollment = retry_stale(self.retry_limit, "set_enrollment_status", move || {
            self.grade_once(update)
        })
        .await?;

        let participant_id = update.participant_id;
        let course_id = update.course_id;
        let status = update.status;
        let mirrored = self
            .mirrors()
            .update_course(course_id, |course| {
                course.set_roster_status(&participant_id, status)
            })
            .await;
        match mirrored {
            Ok(Mirror::Missing) => {
                debug!(%participant_id, %course_id, "course gone, roster status not mirrored");
            }
            Ok(Mirror::Unchanged | Mirror::Updated) => {}
            Err(err) => {
                return Err(TrainingError::diverged(
                    AggregateRef::new(AggregateKind::Participant, *participant_id.as_uuid()),
                    AggregateRef::new(AggregateKind::Course, *course_id.as_uuid()),
                    &err,
                ));
            }
        }
        Ok(enrollment)
    }

    async fn delete_course(&self, course_id: CourseId) -> Result<CascadeReport, TrainingError> {
        let course = self.stores.load_course(&course_id).await?;
        let parent = course.reference();
        let mirrors = self.mirrors();
        let mut report = CascadeReport::default();

        for participant in self.stores.participants_enrolled_in(&course_id).await? {
            if !participant.has_live_enrollment(&course_id) {
                continue;
            }
            let result = mirrors
                .update_participant(participant.id(), |stored| {
                    stored.strip_live_enrollment(&course_id)
                })
                .await;
            record(&mut report, parent, participant.reference(), result);
        }

        if !report.is_complete() {
            return Err(TrainingError::CascadeIncomplete { parent, report });
        }
        if !self.stores.delete_course(&course_id).await? {
            debug!(%course_id, "course already removed");
        }
        info!(%course_id, stripped = report.updated_count(), "course deleted");
        Ok(report)
    }
}

#[cfg(test)]
#[path = "enrollment_coordinator_tests.rs"]
mod tests;
