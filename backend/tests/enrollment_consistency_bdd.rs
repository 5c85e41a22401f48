//! Behavioural tests for mirrored enrollments and affiliations over the
//! in-memory stores, with injected save failures.

use std::sync::{Arc, Mutex};

use mockable::Clock;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio::runtime::Runtime;

use training_backend::domain::ports::{
    EnrollmentOutcome, EnrollmentRequest, FixtureLoginService, NewCompany, NewParticipant,
};
use training_backend::domain::{
    AffiliateStatus, AggregateKind, Company, Course, EnrollmentStatus, Participant,
    ParticipantStatus, TrainingError,
};
use training_backend::inbound::http::state::HttpState;
use training_backend::test_support::{
    FaultPlan, MutableClock, company_name, company_profile, course_details, faulty_stores,
    fixture_timestamp, participant_profile,
};

struct TestContext {
    runtime: Runtime,
    services: HttpState,
    plan: Arc<FaultPlan>,
    course: Option<Course>,
    company: Option<Company>,
    participants: Vec<Participant>,
    enrollments: Vec<Result<EnrollmentOutcome, TrainingError>>,
    last_error: Option<TrainingError>,
}

type SharedContext = Arc<Mutex<TestContext>>;

impl TestContext {
    fn participant(&self) -> &Participant {
        self.participants.first().expect("participant should exist")
    }

    fn course(&self) -> &Course {
        self.course.as_ref().expect("course should exist")
    }

    fn company(&self) -> &Company {
        self.company.as_ref().expect("company should exist")
    }

    fn request(&self, participant: &Participant) -> EnrollmentRequest {
        EnrollmentRequest {
            participant_id: participant.id(),
            course_id: self.course().id(),
        }
    }

    fn enroll_first(&mut self) {
        let request = self.request(self.participant());
        let result = self.runtime.block_on(self.services.enrollment.enroll(request));
        self.enrollments.push(result);
    }

    fn reload_course(&self) -> Course {
        self.runtime
            .block_on(self.services.registry_query.get_course(self.course().id()))
            .expect("course should load")
    }

    fn reload_participant(&self) -> Participant {
        self.runtime
            .block_on(
                self.services
                    .registry_query
                    .get_participant(self.participant().id()),
            )
            .expect("participant should load")
    }

    fn create_participant(&mut self, email: &str, with_company: bool) {
        let company_id = if with_company {
            Some(self.company().id())
        } else {
            None
        };
        let participant = self
            .runtime
            .block_on(self.services.registry.create_participant(NewParticipant {
                profile: participant_profile("Ana López", email),
                company_id,
            }))
            .expect("participant should be created");
        self.participants.push(participant);
    }
}

fn setup_test_context() -> TestContext {
    let runtime = Runtime::new().expect("tokio runtime should initialize");
    let clock: Arc<dyn Clock> = Arc::new(MutableClock::new(fixture_timestamp()));
    let (stores, plan) = faulty_stores(Arc::clone(&clock));
    TestContext {
        runtime,
        services: HttpState::wire(stores, clock, Arc::new(FixtureLoginService), 3),
        plan,
        course: None,
        company: None,
        participants: Vec::new(),
        enrollments: Vec::new(),
        last_error: None,
    }
}

#[fixture]
fn world() -> SharedContext {
    Arc::new(Mutex::new(setup_test_context()))
}

#[given("a course with a single seat")]
fn a_course_with_a_single_seat(world: SharedContext) {
    let mut ctx = world.lock().expect("context lock");
    let course = ctx
        .runtime
        .block_on(
            ctx.services
                .registry
                .create_course(course_details("Manejo higiénico de alimentos", 1)),
        )
        .expect("course should be created");
    ctx.course = Some(course);
}

#[given("a second active participant")]
fn a_second_active_participant(world: SharedContext) {
    let mut ctx = world.lock().expect("context lock");
    ctx.create_participant("beto@example.com", false);
}

#[given("an active participant")]
fn an_active_participant(world: SharedContext) {
    let mut ctx = world.lock().expect("context lock");
    ctx.create_participant("ana@example.com", false);
}

#[given("an active participant affiliated with a company")]
fn an_active_participant_affiliated_with_a_company(world: SharedContext) {
    let mut ctx = world.lock().expect("context lock");
    let company = ctx
        .runtime
        .block_on(ctx.services.registry.register_company(NewCompany {
            name: company_name("Restaurante El Fogón"),
            profile: company_profile("ABC010101AB1"),
        }))
        .expect("company should be registered");
    ctx.company = Some(company);
    ctx.create_participant("ana@example.com", true);
}

#[given("participant saves are failing")]
fn participant_saves_are_failing(world: SharedContext) {
    let ctx = world.lock().expect("context lock");
    ctx.plan.fail_save_of(*ctx.participant().id().as_uuid());
}

#[given("the participant is enrolled in the course")]
fn the_participant_is_enrolled_in_the_course(world: SharedContext) {
    let mut ctx = world.lock().expect("context lock");
    ctx.enroll_first();
    assert!(
        matches!(ctx.enrollments.last(), Some(Ok(_))),
        "enrollment should succeed"
    );
}

#[when("both participants try to enroll")]
fn both_participants_try_to_enroll(world: SharedContext) {
    let mut ctx = world.lock().expect("context lock");
    let requests: Vec<_> = ctx
        .participants
        .iter()
        .map(|participant| ctx.request(participant))
        .collect();
    for request in requests {
        let result = ctx.runtime.block_on(ctx.services.enrollment.enroll(request));
        ctx.enrollments.push(result);
    }
}

#[when("the participant enrolls")]
fn the_participant_enrolls(world: SharedContext) {
    world.lock().expect("context lock").enroll_first();
}

#[when("participant saves recover and the participant enrolls again")]
fn participant_saves_recover_and_the_participant_enrolls_again(world: SharedContext) {
    let mut ctx = world.lock().expect("context lock");
    ctx.plan.heal_save_of(*ctx.participant().id().as_uuid());
    ctx.enroll_first();
}

#[when("the first participant withdraws and the second participant enrolls")]
fn the_first_participant_withdraws_and_the_second_participant_enrolls(world: SharedContext) {
    let mut ctx = world.lock().expect("context lock");
    let first = ctx.request(ctx.participant());
    ctx.runtime
        .block_on(ctx.services.enrollment.withdraw(first))
        .expect("withdrawal should succeed");
    let second = ctx.request(ctx.participants.get(1).expect("second participant"));
    let result = ctx.runtime.block_on(ctx.services.enrollment.enroll(second));
    ctx.enrollments.push(result);
}

#[when("the participant is deactivated")]
fn the_participant_is_deactivated(world: SharedContext) {
    let ctx = world.lock().expect("context lock");
    let report = ctx
        .runtime
        .block_on(
            ctx.services
                .lifecycle
                .deactivate_participant(ctx.participant().id()),
        )
        .expect("deactivation should succeed");
    assert!(report.cascade.is_complete());
}

#[when("the company is deleted")]
fn the_company_is_deleted(world: SharedContext) {
    let mut ctx = world.lock().expect("context lock");
    let result = ctx
        .runtime
        .block_on(ctx.services.affiliation.delete_company(ctx.company().id()));
    ctx.last_error = result.err();
}

#[when("the participant is detached and the company is deleted")]
fn the_participant_is_detached_and_the_company_is_deleted(world: SharedContext) {
    let ctx = world.lock().expect("context lock");
    let company_id = ctx.company().id();
    ctx.runtime
        .block_on(
            ctx.services
                .affiliation
                .detach(company_id, ctx.participant().id()),
        )
        .expect("detach should succeed");
    ctx.runtime
        .block_on(ctx.services.affiliation.delete_company(company_id))
        .expect("delete should succeed");
}

#[then("the first participant holds the seat")]
fn the_first_participant_holds_the_seat(world: SharedContext) {
    let ctx = world.lock().expect("context lock");
    let first = ctx.enrollments.first().expect("first result");
    assert!(first.is_ok(), "first enrollment failed: {first:?}");
    let course = ctx.reload_course();
    assert_eq!(course.live_count(), 1);
    assert!(course.has_live_entry(&ctx.participant().id()));
}

#[then("the second participant is turned away for capacity")]
fn the_second_participant_is_turned_away_for_capacity(world: SharedContext) {
    let ctx = world.lock().expect("context lock");
    let second = ctx.enrollments.get(1).expect("second result");
    assert!(
        matches!(second, Err(TrainingError::CapacityExceeded { maximum: 1, .. })),
        "expected capacity exceeded, got {second:?}"
    );
    let turned_away = ctx.participants.get(1).expect("second participant");
    let stored = ctx
        .runtime
        .block_on(ctx.services.registry_query.get_participant(turned_away.id()))
        .expect("participant should load");
    assert!(stored.enrollments().is_empty());
}

#[then("the second participant holds the seat")]
fn the_second_participant_holds_the_seat(world: SharedContext) {
    let ctx = world.lock().expect("context lock");
    let result = ctx.enrollments.last().expect("enrollment result");
    assert!(result.is_ok(), "second enrollment failed: {result:?}");
    let second = ctx.participants.get(1).expect("second participant");
    let course = ctx.reload_course();
    assert_eq!(course.live_count(), 1);
    assert!(course.has_live_entry(&second.id()));
    assert!(!course.has_live_entry(&ctx.participant().id()));
}

#[then("the enrollment reports a partial write")]
fn the_enrollment_reports_a_partial_write(world: SharedContext) {
    let ctx = world.lock().expect("context lock");
    let result = ctx.enrollments.last().expect("enrollment result");
    assert!(
        matches!(result, Err(TrainingError::PartialWriteFailure { .. })),
        "expected partial write, got {result:?}"
    );
    assert!(ctx.reload_course().has_live_entry(&ctx.participant().id()));
    assert!(ctx.reload_participant().enrollments().is_empty());
}

#[then("the participant side is repaired")]
fn the_participant_side_is_repaired(world: SharedContext) {
    let ctx = world.lock().expect("context lock");
    let outcome = ctx
        .enrollments
        .last()
        .expect("enrollment result")
        .as_ref()
        .expect("retry should succeed");
    assert_eq!(outcome.repaired, Some(AggregateKind::Participant));
}

#[then("the roster and the participant record agree")]
fn the_roster_and_the_participant_record_agree(world: SharedContext) {
    let ctx = world.lock().expect("context lock");
    let course = ctx.reload_course();
    let participant = ctx.reload_participant();
    let entry = course
        .roster_entry(&participant.id())
        .expect("roster entry");
    let enrollment = participant
        .enrollment(&course.id())
        .expect("participant enrollment");
    assert_eq!(entry.enrolled_at, enrollment.enrolled_at);
    assert!(entry.is_live() && enrollment.is_live());
}

#[then("the participant is inactive")]
fn the_participant_is_inactive(world: SharedContext) {
    let ctx = world.lock().expect("context lock");
    let participant = ctx.reload_participant();
    assert_eq!(participant.status(), ParticipantStatus::Inactive);
    assert!(participant.live_enrollments().next().is_none());
}

#[then("the roster entry is withdrawn")]
fn the_roster_entry_is_withdrawn(world: SharedContext) {
    let ctx = world.lock().expect("context lock");
    let course = ctx.reload_course();
    let entry = course
        .roster_entry(&ctx.participant().id())
        .expect("roster entry");
    assert_eq!(entry.status, EnrollmentStatus::Withdrawn);
    assert_eq!(course.live_count(), 0);
}

#[then("the company lists the participant as inactive")]
fn the_company_lists_the_participant_as_inactive(world: SharedContext) {
    let ctx = world.lock().expect("context lock");
    let company = ctx
        .runtime
        .block_on(ctx.services.registry_query.get_company(ctx.company().id()))
        .expect("company should load");
    let affiliate = company
        .affiliate(&ctx.participant().id())
        .expect("affiliate entry");
    assert_eq!(affiliate.status, AffiliateStatus::Inactive);
}

#[then("the deletion is refused because the company has affiliates")]
fn the_deletion_is_refused_because_the_company_has_affiliates(world: SharedContext) {
    let ctx = world.lock().expect("context lock");
    assert!(
        matches!(ctx.last_error, Some(TrainingError::HasAffiliates { .. })),
        "expected has affiliates, got {:?}",
        ctx.last_error
    );
}

#[then("the company is gone")]
fn the_company_is_gone(world: SharedContext) {
    let ctx = world.lock().expect("context lock");
    let result = ctx
        .runtime
        .block_on(ctx.services.registry_query.get_company(ctx.company().id()));
    assert!(matches!(result, Err(TrainingError::NotFound { .. })));
    assert!(ctx.reload_participant().company().is_none());
}

#[scenario(
    path = "tests/features/enrollment_consistency.feature",
    name = "The last seat goes to the first participant until it is freed"
)]
fn the_last_seat_goes_to_the_first_participant_until_it_is_freed(world: SharedContext) {
    drop(world);
}

#[scenario(
    path = "tests/features/enrollment_consistency.feature",
    name = "A retry repairs a half-written enrollment"
)]
fn a_retry_repairs_a_half_written_enrollment(world: SharedContext) {
    drop(world);
}

#[scenario(
    path = "tests/features/enrollment_consistency.feature",
    name = "Deactivation withdraws enrollments and marks the affiliate inactive"
)]
fn deactivation_withdraws_enrollments_and_marks_the_affiliate_inactive(world: SharedContext) {
    drop(world);
}

#[scenario(
    path = "tests/features/enrollment_consistency.feature",
    name = "A company with affiliates cannot be deleted"
)]
fn a_company_with_affiliates_cannot_be_deleted(world: SharedContext) {
    drop(world);
}
