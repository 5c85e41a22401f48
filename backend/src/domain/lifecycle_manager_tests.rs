//! Tests for the lifecycle manager.

use std::sync::Arc;

use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{AffiliationCommand, EnrollmentCommand, EnrollmentRequest};
use crate::domain::{AffiliationManager, Company, Course, EnrollmentCoordinator, ParticipantStatus};
use crate::outbound::memory::{
    InMemoryCompanyRepository, InMemoryCourseRepository, InMemoryParticipantRepository,
};
use crate::test_support::{
    FaultPlan, Faulty, FaultyStores, MutableClock, faulty_stores, fixture_timestamp, new_company,
    new_course, new_participant,
};

type Lifecycle = LifecycleManager<
    Faulty<InMemoryCourseRepository>,
    Faulty<InMemoryParticipantRepository>,
    Faulty<InMemoryCompanyRepository>,
>;
type Coordinator = EnrollmentCoordinator<
    Faulty<InMemoryCourseRepository>,
    Faulty<InMemoryParticipantRepository>,
    Faulty<InMemoryCompanyRepository>,
>;
type Affiliation = AffiliationManager<
    Faulty<InMemoryCourseRepository>,
    Faulty<InMemoryParticipantRepository>,
    Faulty<InMemoryCompanyRepository>,
>;

struct Harness {
    stores: FaultyStores,
    plan: Arc<FaultPlan>,
    clock: Arc<MutableClock>,
    lifecycle: Lifecycle,
    enrollment: Coordinator,
    affiliation: Affiliation,
}

#[fixture]
fn harness() -> Harness {
    let clock = Arc::new(MutableClock::new(fixture_timestamp()));
    let shared: Arc<dyn Clock> = Arc::clone(&clock) as Arc<dyn Clock>;
    let (stores, plan) = faulty_stores(Arc::clone(&shared));
    Harness {
        lifecycle: LifecycleManager::new(stores.clone(), Arc::clone(&shared)),
        enrollment: EnrollmentCoordinator::new(stores.clone(), Arc::clone(&shared)),
        affiliation: AffiliationManager::new(stores.clone(), shared),
        stores,
        plan,
        clock,
    }
}

impl Harness {
    /// Company with one affiliate enrolled in two courses.
    async fn populated(&self) -> (Company, Participant, Course, Course) {
        let company = new_company("Fonda Doña Lupe", "ABC010101AB1");
        self.stores.save_company(&company, None).await.expect("company");
        let participant = new_participant("Ana López", "ana@example.com");
        self.stores
            .save_participant(&participant, None)
            .await
            .expect("participant");
        let first = new_course("Higiene", 5);
        let second = new_course("Primeros auxilios", 5);
        for course in [&first, &second] {
            self.stores.save_course(course, None).await.expect("course");
        }

        self.affiliation
            .affiliate(company.id(), participant.id())
            .await
            .expect("affiliate");
        for course in [&first, &second] {
            self.enrollment
                .enroll(EnrollmentRequest {
                    participant_id: participant.id(),
                    course_id: course.id(),
                })
                .await
                .expect("enroll");
        }
        (company, participant, first, second)
    }
}

#[rstest]
#[tokio::test]
async fn deactivation_flips_every_mirror(harness: Harness) {
    let (company, participant, first, second) = harness.populated().await;
    harness.clock.advance_minutes(30);

    let report = harness
        .lifecycle
        .deactivate_participant(participant.id())
        .await
        .expect("deactivate");
    assert_eq!(report.participant.status(), ParticipantStatus::Inactive);
    assert_eq!(
        report.participant.deactivated_at(),
        Some(fixture_timestamp() + chrono::TimeDelta::minutes(30))
    );
    assert!(report.cascade.is_complete());
    assert_eq!(report.cascade.updated_count(), 3);

    let company = harness.stores.load_company(&company.id()).await.expect("company");
    assert_eq!(
        company.affiliate(&participant.id()).map(|entry| entry.status),
        Some(AffiliateStatus::Inactive)
    );
    for course in [first, second] {
        let course = harness.stores.load_course(&course.id()).await.expect("course");
        assert!(!course.has_live_entry(&participant.id()));
        assert!(course.roster_entry(&participant.id()).is_some());
    }
}

#[rstest]
#[tokio::test]
async fn deactivating_twice_is_rejected(harness: Harness) {
    let (_, participant, _, _) = harness.populated().await;
    harness
        .lifecycle
        .deactivate_participant(participant.id())
        .await
        .expect("first");

    let error = harness
        .lifecycle
        .deactivate_participant(participant.id())
        .await
        .expect_err("second");
    assert_eq!(error, TrainingError::AlreadyInactive { participant_id: participant.id() });
}

#[rstest]
#[tokio::test]
async fn deactivation_keeps_going_past_a_failed_mirror(harness: Harness) {
    let (_, participant, first, second) = harness.populated().await;
    harness.plan.fail_save_of(*first.id().as_uuid());

    let report = harness
        .lifecycle
        .deactivate_participant(participant.id())
        .await
        .expect("primary write succeeds");
    let failed: Vec<_> = report
        .cascade
        .failures()
        .map(|entry| entry.target)
        .collect();
    assert_eq!(failed, vec![first.reference()]);
    assert!(!report.participant.is_active());

    let second = harness.stores.load_course(&second.id()).await.expect("course");
    assert!(!second.has_live_entry(&participant.id()));
    let first = harness.stores.load_course(&first.id()).await.expect("course");
    assert!(first.has_live_entry(&participant.id()));
}

#[rstest]
#[tokio::test]
async fn hard_delete_strips_mirrors_first(harness: Harness) {
    let (company, participant, first, _) = harness.populated().await;

    let report = harness
        .lifecycle
        .delete_participant(participant.id())
        .await
        .expect("delete");
    assert!(report.is_complete());
    assert!(
        harness
            .stores
            .find_participant(&participant.id())
            .await
            .expect("find")
            .is_none()
    );
    let company = harness.stores.load_company(&company.id()).await.expect("company");
    assert!(!company.has_affiliates());
    let first = harness.stores.load_course(&first.id()).await.expect("course");
    assert!(first.roster().is_empty());
}

#[rstest]
#[tokio::test]
async fn hard_delete_aborts_on_incomplete_cascade(harness: Harness) {
    let (company, participant, _, _) = harness.populated().await;
    harness.plan.fail_save_of(*company.id().as_uuid());

    let error = harness
        .lifecycle
        .delete_participant(participant.id())
        .await
        .expect_err("incomplete");
    assert_eq!(error.code(), "cascade_incomplete");
    assert!(
        harness
            .stores
            .find_participant(&participant.id())
            .await
            .expect("find")
            .is_some()
    );
}
