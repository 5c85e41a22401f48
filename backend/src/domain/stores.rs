//! Bundle of the three document stores used by every training service.
//!
//! Each call is bounded by the configured I/O timeout. An elapsed timeout is
//! reported as [`TrainingError::Unavailable`]; the write may still have
//! landed, which is why every service operation is safe to retry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::ports::{
    CompanyRepository, CourseRepository, ParticipantRepository, StoreError,
};
use crate::domain::{
    AggregateKind, AggregateRef, Company, CompanyId, Course, CourseId, EmailAddress, Participant,
    ParticipantId, TaxId, TrainingError,
};

/// Default bound on a single store call.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Handles to the course, participant and company stores.
pub struct TrainingStores<C: ?Sized, P: ?Sized, K: ?Sized> {
    courses: Arc<C>,
    participants: Arc<P>,
    companies: Arc<K>,
    io_timeout: Duration,
}

impl<C: ?Sized, P: ?Sized, K: ?Sized> Clone for TrainingStores<C, P, K> {
    fn clone(&self) -> Self {
        Self {
            courses: Arc::clone(&self.courses),
            participants: Arc::clone(&self.participants),
            companies: Arc::clone(&self.companies),
            io_timeout: self.io_timeout,
        }
    }
}

impl<C: ?Sized, P: ?Sized, K: ?Sized> TrainingStores<C, P, K> {
    /// Bundle the three stores with the default timeout.
    pub fn new(courses: Arc<C>, participants: Arc<P>, companies: Arc<K>) -> Self {
        Self {
            courses,
            participants,
            companies,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Override the per-call timeout.
    #[must_use]
    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    /// Configured per-call timeout.
    pub const fn io_timeout(&self) -> Duration {
        self.io_timeout
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.io_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.io_timeout.as_millis(),
                    "store call timed out"
                );
                Err(StoreError::timeout(format!(
                    "{operation} exceeded {} ms",
                    self.io_timeout.as_millis()
                )))
            }
        }
    }
}

/// Convert a store failure into the service taxonomy. `target` names the
/// document a compare-and-set was aimed at.
pub fn store_failure(error: StoreError, target: Option<AggregateRef>) -> TrainingError {
    debug!(kind = error.kind(), %error, "store call failed");
    match error {
        StoreError::Connection { message } | StoreError::Timeout { message } => {
            TrainingError::Unavailable { message }
        }
        StoreError::Query { message } | StoreError::Corrupt { message } => {
            TrainingError::Internal { message }
        }
        StoreError::Duplicate { message } => TrainingError::Conflict { message },
        StoreError::RevisionMismatch { expected, actual } => match target {
            Some(target) => TrainingError::StaleRevision {
                target,
                expected,
                actual,
            },
            None => TrainingError::Internal {
                message: format!("unexpected revision mismatch ({expected} != {actual})"),
            },
        },
    }
}

fn course_ref(id: &CourseId) -> AggregateRef {
    AggregateRef::new(AggregateKind::Course, *id.as_uuid())
}

fn participant_ref(id: &ParticipantId) -> AggregateRef {
    AggregateRef::new(AggregateKind::Participant, *id.as_uuid())
}

fn company_ref(id: &CompanyId) -> AggregateRef {
    AggregateRef::new(AggregateKind::Company, *id.as_uuid())
}

impl<C, P, K> TrainingStores<C, P, K>
where
    C: CourseRepository + ?Sized,
    P: ParticipantRepository + ?Sized,
    K: CompanyRepository + ?Sized,
{
    /// Course by id, if stored.
    pub async fn find_course(&self, id: &CourseId) -> Result<Option<Course>, TrainingError> {
        self.bounded("course.find", self.courses.find_by_id(id))
            .await
            .map_err(|err| store_failure(err, None))
    }

    /// Course by id, or [`TrainingError::NotFound`].
    pub async fn load_course(&self, id: &CourseId) -> Result<Course, TrainingError> {
        self.find_course(id)
            .await?
            .ok_or_else(|| TrainingError::course_not_found(*id))
    }

    /// Every course.
    pub async fn list_courses(&self) -> Result<Vec<Course>, TrainingError> {
        self.bounded("course.list", self.courses.list())
            .await
            .map_err(|err| store_failure(err, None))
    }

    /// Insert (`expected = None`) or compare-and-set a course.
    pub async fn save_course(
        &self,
        course: &Course,
        expected: Option<u32>,
    ) -> Result<(), TrainingError> {
        self.bounded("course.save", self.courses.save(course, expected))
            .await
            .map_err(|err| store_failure(err, Some(course.reference())))
    }

    /// Remove a course.
    pub async fn delete_course(&self, id: &CourseId) -> Result<bool, TrainingError> {
        self.bounded("course.delete", self.courses.delete(id))
            .await
            .map_err(|err| store_failure(err, Some(course_ref(id))))
    }

    /// Participant by id, if stored.
    pub async fn find_participant(
        &self,
        id: &ParticipantId,
    ) -> Result<Option<Participant>, TrainingError> {
        self.bounded("participant.find", self.participants.find_by_id(id))
            .await
            .map_err(|err| store_failure(err, None))
    }

    /// Participant by id, or [`TrainingError::NotFound`].
    pub async fn load_participant(&self, id: &ParticipantId) -> Result<Participant, TrainingError> {
        self.find_participant(id)
            .await?
            .ok_or_else(|| TrainingError::participant_not_found(*id))
    }

    /// Participant registered under `email`.
    pub async fn find_participant_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<Participant>, TrainingError> {
        self.bounded("participant.find_by_email", self.participants.find_by_email(email))
            .await
            .map_err(|err| store_failure(err, None))
    }

    /// Every participant.
    pub async fn list_participants(&self) -> Result<Vec<Participant>, TrainingError> {
        self.bounded("participant.list", self.participants.list())
            .await
            .map_err(|err| store_failure(err, None))
    }

    /// Participants linked to `company_id`.
    pub async fn participants_of_company(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<Participant>, TrainingError> {
        self.bounded(
            "participant.list_by_company",
            self.participants.list_by_company(company_id),
        )
        .await
        .map_err(|err| store_failure(err, None))
    }

    /// Participants holding any record for `course_id`.
    pub async fn participants_enrolled_in(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<Participant>, TrainingError> {
        self.bounded(
            "participant.list_enrolled_in",
            self.participants.list_enrolled_in(course_id),
        )
        .await
        .map_err(|err| store_failure(err, None))
    }

    /// Insert (`expected = None`) or compare-and-set a participant.
    pub async fn save_participant(
        &self,
        participant: &Participant,
        expected: Option<u32>,
    ) -> Result<(), TrainingError> {
        self.bounded("participant.save", self.participants.save(participant, expected))
            .await
            .map_err(|err| store_failure(err, Some(participant.reference())))
    }

    /// Refresh the company name copied onto linked participants.
    pub async fn rename_company_links(
        &self,
        company_id: &CompanyId,
        name: &str,
    ) -> Result<usize, TrainingError> {
        self.bounded(
            "participant.rename_company",
            self.participants.rename_company(company_id, name),
        )
        .await
        .map_err(|err| store_failure(err, None))
    }

    /// Remove a participant.
    pub async fn delete_participant(&self, id: &ParticipantId) -> Result<bool, TrainingError> {
        self.bounded("participant.delete", self.participants.delete(id))
            .await
            .map_err(|err| store_failure(err, Some(participant_ref(id))))
    }

    /// Company by id, if stored.
    pub async fn find_company(&self, id: &CompanyId) -> Result<Option<Company>, TrainingError> {
        self.bounded("company.find", self.companies.find_by_id(id))
            .await
            .map_err(|err| store_failure(err, None))
    }

    /// Company by id, or [`TrainingError::NotFound`].
    pub async fn load_company(&self, id: &CompanyId) -> Result<Company, TrainingError> {
        self.find_company(id)
            .await?
            .ok_or_else(|| TrainingError::company_not_found(*id))
    }

    /// Company registered under `tax_id`.
    pub async fn find_company_by_tax_id(
        &self,
        tax_id: &TaxId,
    ) -> Result<Option<Company>, TrainingError> {
        self.bounded("company.find_by_tax_id", self.companies.find_by_tax_id(tax_id))
            .await
            .map_err(|err| store_failure(err, None))
    }

    /// Every company.
    pub async fn list_companies(&self) -> Result<Vec<Company>, TrainingError> {
        self.bounded("company.list", self.companies.list())
            .await
            .map_err(|err| store_failure(err, None))
    }

    /// Insert (`expected = None`) or compare-and-set a company.
    pub async fn save_company(
        &self,
        company: &Company,
        expected: Option<u32>,
    ) -> Result<(), TrainingError> {
        self.bounded("company.save", self.companies.save(company, expected))
            .await
            .map_err(|err| store_failure(err, Some(company.reference())))
    }

    /// Remove a company.
    pub async fn delete_company(&self, id: &CompanyId) -> Result<bool, TrainingError> {
        self.bounded("company.delete", self.companies.delete(id))
            .await
            .map_err(|err| store_failure(err, Some(company_ref(id))))
    }
}

/// Re-run `attempt` while it fails with [`TrainingError::StaleRevision`],
/// at most `limit` extra times.
///
/// Only the first write of an operation may surface a stale revision; a
/// failure of the second write is already a
/// [`TrainingError::PartialWriteFailure`] and is returned as is.
pub async fn retry_stale<T, F, Fut>(
    limit: u32,
    operation: &'static str,
    mut attempt: F,
) -> Result<T, TrainingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TrainingError>>,
{
    let mut retries = 0_u32;
    loop {
        match attempt().await {
            Err(TrainingError::StaleRevision {
                target,
                expected,
                actual,
            }) if retries < limit => {
                retries += 1;
                warn!(
                    operation,
                    %target,
                    expected,
                    actual,
                    retry = retries,
                    "concurrent modification, retrying"
                );
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use rstest::rstest;

    use super::*;
    use crate::domain::ports::{
        MockCompanyRepository, MockCourseRepository, MockParticipantRepository,
    };

    struct SlowCourses;

    #[async_trait]
    impl CourseRepository for SlowCourses {
        async fn find_by_id(&self, _id: &CourseId) -> Result<Option<Course>, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }

        async fn list(&self) -> Result<Vec<Course>, StoreError> {
            Ok(Vec::new())
        }

        async fn save(&self, _course: &Course, _expected: Option<u32>) -> Result<(), StoreError> {
            Ok(())
        }

        async fn delete(&self, _id: &CourseId) -> Result<bool, StoreError> {
            Ok(false)
        }
    }

    #[rstest]
    #[case(StoreError::connection("refused"), "unavailable")]
    #[case(StoreError::timeout("slow"), "unavailable")]
    #[case(StoreError::query("syntax"), "internal")]
    #[case(StoreError::corrupt("bad json"), "internal")]
    #[case(StoreError::duplicate("tax id"), "conflict")]
    fn store_failures_map_to_service_codes(#[case] error: StoreError, #[case] code: &str) {
        assert_eq!(store_failure(error, None).code(), code);
    }

    #[rstest]
    fn revision_mismatch_names_the_target() {
        let id = CourseId::random();
        let target = course_ref(&id);
        let error = store_failure(StoreError::revision_mismatch(2_u32, 3_u32), Some(target));
        assert_eq!(
            error,
            TrainingError::StaleRevision {
                target,
                expected: 2,
                actual: 3
            }
        );
    }

    #[tokio::test]
    async fn slow_calls_become_unavailable() {
        let stores = TrainingStores::new(
            Arc::new(SlowCourses),
            Arc::new(MockParticipantRepository::new()),
            Arc::new(MockCompanyRepository::new()),
        )
        .with_io_timeout(Duration::from_millis(10));

        let error = stores
            .find_course(&CourseId::random())
            .await
            .expect_err("timeout");
        assert_eq!(error.code(), "unavailable");
    }

    #[tokio::test]
    async fn load_reports_missing_documents() {
        let mut courses = MockCourseRepository::new();
        courses.expect_find_by_id().return_once(|_| Ok(None));
        let stores = TrainingStores::new(
            Arc::new(courses),
            Arc::new(MockParticipantRepository::new()),
            Arc::new(MockCompanyRepository::new()),
        );

        let id = CourseId::random();
        let error = stores.load_course(&id).await.expect_err("missing");
        assert_eq!(error, TrainingError::course_not_found(id));
    }

    fn stale() -> TrainingError {
        TrainingError::StaleRevision {
            target: course_ref(&CourseId::random()),
            expected: 1,
            actual: 2,
        }
    }

    #[tokio::test]
    async fn retry_stale_reruns_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = retry_stale(3, "probe", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(stale())
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_stale_gives_up_after_limit() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = retry_stale(2, "probe", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(stale())
        })
        .await;

        assert_eq!(result.expect_err("exhausted").code(), "stale_revision");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_stale_passes_other_errors_through() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = retry_stale(5, "probe", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TrainingError::validation("bad"))
        })
        .await;

        assert_eq!(result.expect_err("validation").code(), "validation_failed");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
