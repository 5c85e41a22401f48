//! Integration tests for `DieselCourseRepository` against embedded PostgreSQL.

use chrono::TimeDelta;
use postgres::{Client, NoTls};
use rstest::{fixture, rstest};
use training_backend::domain::ports::{CourseRepository, StoreError};
use training_backend::domain::{Course, CourseId, ParticipantId};
use training_backend::outbound::persistence::DieselCourseRepository;
use training_backend::test_support::{course_details, fixture_timestamp, new_course};

mod support;

use support::{
    EmbeddedDatabase, embedded_database, format_postgres_error, handle_cluster_setup_failure,
};

struct TestContext {
    repository: DieselCourseRepository,
    database: EmbeddedDatabase,
}

impl TestContext {
    fn save(&self, course: &Course, expected: Option<u32>) -> Result<(), StoreError> {
        self.database
            .runtime
            .block_on(self.repository.save(course, expected))
    }
}

fn setup_context() -> Result<TestContext, String> {
    let database = embedded_database()?;
    let repository = DieselCourseRepository::new(database.pool("courses")?);
    Ok(TestContext {
        repository,
        database,
    })
}

#[fixture]
fn repo_context() -> Option<TestContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn stored_revision(url: &str, course: &Course) -> Result<i32, String> {
    let mut client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
    let row = client
        .query_one(
            "SELECT revision FROM courses WHERE id = $1",
            &[course.id().as_uuid()],
        )
        .map_err(|err| format_postgres_error(&err))?;
    Ok(row.get("revision"))
}

#[rstest]
fn courses_list_oldest_first(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: courses_list_oldest_first skipped");
        return;
    };
    let later = Course::create(
        CourseId::random(),
        course_details("Manejo de alimentos", 8),
        fixture_timestamp() + TimeDelta::hours(1),
    )
    .expect("later course");
    let earlier = new_course("Higiene", 10);
    context.save(&later, None).expect("insert later");
    context.save(&earlier, None).expect("insert earlier");

    let listed = context
        .database
        .runtime
        .block_on(context.repository.list())
        .expect("list");
    assert_eq!(listed, vec![earlier.clone(), later]);

    let found = context
        .database
        .runtime
        .block_on(context.repository.find_by_id(&earlier.id()))
        .expect("find");
    assert_eq!(found, Some(earlier));
}

#[rstest]
fn roster_writes_are_compare_and_set(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: roster_writes_are_compare_and_set skipped");
        return;
    };
    let course = new_course("Higiene", 10);
    context.save(&course, None).expect("insert");

    let mut winner = course.clone();
    winner.admit(ParticipantId::random(), fixture_timestamp());
    let expected = winner.advance(fixture_timestamp());
    context.save(&winner, Some(expected)).expect("first writer");

    let mut loser = course;
    loser.admit(ParticipantId::random(), fixture_timestamp());
    let expected = loser.advance(fixture_timestamp());
    assert_eq!(
        context.save(&loser, Some(expected)),
        Err(StoreError::RevisionMismatch {
            expected: 1,
            actual: 2,
        })
    );

    let stored = context
        .database
        .runtime
        .block_on(context.repository.find_by_id(&winner.id()))
        .expect("find")
        .expect("stored");
    assert_eq!(stored.roster(), winner.roster());
    assert_eq!(
        stored_revision(context.database.url(), &winner).expect("revision column"),
        2
    );
}

#[rstest]
fn updating_a_deleted_course_is_not_a_revision_mismatch(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!(
            "SKIP-TEST-CLUSTER: updating_a_deleted_course_is_not_a_revision_mismatch skipped"
        );
        return;
    };
    let mut course = new_course("Higiene", 10);
    context.save(&course, None).expect("insert");
    let runtime = &context.database.runtime;
    assert_eq!(runtime.block_on(context.repository.delete(&course.id())), Ok(true));
    assert_eq!(runtime.block_on(context.repository.delete(&course.id())), Ok(false));

    let expected = course.advance(fixture_timestamp());
    let error = context
        .save(&course, Some(expected))
        .expect_err("deleted course");
    assert!(matches!(error, StoreError::Query { .. }), "got {error:?}");
}
