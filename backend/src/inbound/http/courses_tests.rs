//! Tests for course HTTP handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test;
use rstest::rstest;
use serde_json::{Value, json};

use super::*;
use crate::domain::ports::MockEnrollmentCommand;
use crate::domain::{ErrorCode, TrainingError};
use crate::inbound::http::test_utils::{admin_login, memory_state, session_cookie, test_app};
use crate::test_support::{course_details, participant_profile};

fn id_of(body: &Value) -> String {
    body.get("id")
        .and_then(Value::as_str)
        .expect("id in body")
        .to_owned()
}

#[actix_web::test]
async fn course_routes_require_a_session() {
    let app = test::init_service(test_app(memory_state())).await;

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/courses")
            .set_json(course_details("Higiene", 5))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn create_fetch_and_list_courses() {
    let app = test::init_service(test_app(memory_state())).await;
    let cookie = session_cookie(&test::call_service(&app, admin_login().to_request()).await);

    let created = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/courses")
            .cookie(cookie.clone())
            .set_json(course_details("Higiene", 5))
            .to_request(),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(created).await;
    let id = id_of(&body);
    assert_eq!(body.pointer("/details/cupoMaximo"), Some(&json!(5)));

    let fetched = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/courses/{id}"))
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(fetched.status(), StatusCode::OK);

    let listed = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/courses")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    let list: Vec<Value> = test::read_body_json(listed).await;
    assert_eq!(list.len(), 1);
}

#[rstest]
#[case("not-a-uuid", StatusCode::BAD_REQUEST)]
#[case("3fa85f64-5717-4562-b3fc-2c963f66afa6", StatusCode::NOT_FOUND)]
#[actix_web::test]
async fn bad_or_unknown_course_ids(#[case] raw: &str, #[case] expected: StatusCode) {
    let app = test::init_service(test_app(memory_state())).await;
    let cookie = session_cookie(&test::call_service(&app, admin_login().to_request()).await);

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/courses/{raw}"))
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), expected);
}

#[actix_web::test]
async fn inverted_dates_are_a_validation_failure() {
    let app = test::init_service(test_app(memory_state())).await;
    let cookie = session_cookie(&test::call_service(&app, admin_login().to_request()).await);
    let mut details = course_details("Higiene", 5);
    std::mem::swap(&mut details.starts_at, &mut details.ends_at);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/courses")
            .cookie(cookie)
            .set_json(details)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Error = test::read_body_json(res).await;
    assert_eq!(
        body.details().and_then(|d| d.get("code")),
        Some(&json!("validation_failed"))
    );
}

#[actix_web::test]
async fn enroll_fill_and_withdraw() {
    let app = test::init_service(test_app(memory_state())).await;
    let cookie = session_cookie(&test::call_service(&app, admin_login().to_request()).await);

    let course: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/courses")
            .cookie(cookie.clone())
            .set_json(course_details("Higiene", 1))
            .to_request(),
    )
    .await;
    let course_id = id_of(&course);
    let mut participants = Vec::new();
    for email in ["ana@example.com", "luis@example.com"] {
        let participant: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/participants")
                .cookie(cookie.clone())
                .set_json(participant_profile("Ana López", email))
                .to_request(),
        )
        .await;
        participants.push(id_of(&participant));
    }
    let (first, second) = (&participants[0], &participants[1]);

    let seated = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/courses/{course_id}/enroll"))
            .cookie(cookie.clone())
            .set_json(json!({ "participantId": first }))
            .to_request(),
    )
    .await;
    assert_eq!(seated.status(), StatusCode::CREATED);

    let full = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/courses/{course_id}/enroll"))
            .cookie(cookie.clone())
            .set_json(json!({ "participantId": second }))
            .to_request(),
    )
    .await;
    assert_eq!(full.status(), StatusCode::CONFLICT);
    let body: Error = test::read_body_json(full).await;
    assert_eq!(
        body.details().and_then(|d| d.get("code")),
        Some(&json!("capacity_exceeded"))
    );

    let roster: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/courses/{course_id}/roster"))
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(roster.get("liveCount"), Some(&json!(1)));
    assert_eq!(roster.get("seatsLeft"), Some(&json!(0)));

    let withdrawn = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/v1/courses/{course_id}/enroll/{first}"))
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(withdrawn.status(), StatusCode::OK);
}

#[actix_web::test]
async fn enroll_without_participant_is_a_missing_field() {
    let app = test::init_service(test_app(memory_state())).await;
    let cookie = session_cookie(&test::call_service(&app, admin_login().to_request()).await);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/courses/{}/enroll", CourseId::random()))
            .cookie(cookie)
            .set_json(json!({}))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Error = test::read_body_json(res).await;
    assert_eq!(
        body.details().and_then(|d| d.get("field")),
        Some(&json!("participantId"))
    );
}

#[actix_web::test]
async fn exhausted_retries_surface_as_conflict() {
    let mut enrollment = MockEnrollmentCommand::new();
    enrollment.expect_enroll().times(1).returning(|request| {
        Err(TrainingError::StaleRevision {
            target: crate::domain::AggregateRef::new(
                crate::domain::AggregateKind::Course,
                *request.course_id.as_uuid(),
            ),
            expected: 2,
            actual: 3,
        })
    });
    let mut state = memory_state();
    state.enrollment = Arc::new(enrollment);
    let app = test::init_service(test_app(state)).await;
    let cookie = session_cookie(&test::call_service(&app, admin_login().to_request()).await);

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/courses/{}/enroll", CourseId::random()))
            .cookie(cookie)
            .set_json(json!({ "participantId": ParticipantId::random() }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Error = test::read_body_json(res).await;
    assert_eq!(body.code(), ErrorCode::Conflict);
    assert_eq!(
        body.details().and_then(|d| d.get("code")),
        Some(&json!("stale_revision"))
    );
}

#[actix_web::test]
async fn deleting_a_course_reports_the_cascade() {
    let app = test::init_service(test_app(memory_state())).await;
    let cookie = session_cookie(&test::call_service(&app, admin_login().to_request()).await);
    let course: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/courses")
            .cookie(cookie.clone())
            .set_json(course_details("Higiene", 3))
            .to_request(),
    )
    .await;
    let course_id = id_of(&course);

    let res = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/v1/courses/{course_id}"))
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let gone = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/courses/{course_id}"))
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}
