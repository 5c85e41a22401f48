//! Course registry, roster and enrollment endpoints.
//!
//! ```text
//! POST   /api/v1/courses
//! GET    /api/v1/courses
//! GET    /api/v1/courses/{id}
//! PUT    /api/v1/courses/{id}
//! DELETE /api/v1/courses/{id}
//! GET    /api/v1/courses/{id}/roster
//! POST   /api/v1/courses/{id}/enroll {"participantId":"..."}
//! DELETE /api/v1/courses/{id}/enroll/{participantId}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{
    CourseRoster, EnrollmentOutcome, EnrollmentRequest, WithdrawalOutcome,
};
use crate::domain::{CascadeReport, Course, CourseDetails, CourseId, Error, ParticipantId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, require_id};

const COURSE_ID: FieldName = FieldName::new("id");
const PARTICIPANT_ID: FieldName = FieldName::new("participantId");

/// Request body for `POST /api/v1/courses/{id}/enroll`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequestBody {
    pub participant_id: Option<String>,
}

/// Register a course.
#[utoipa::path(
    post,
    path = "/api/v1/courses",
    request_body = CourseDetails,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["courses"],
    operation_id = "createCourse",
    security(("SessionCookie" = []))
)]
#[post("/courses")]
pub async fn create_course(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CourseDetails>,
) -> ApiResult<HttpResponse> {
    session.require_admin()?;
    let course = state.registry.create_course(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(course))
}

/// List every course.
#[utoipa::path(
    get,
    path = "/api/v1/courses",
    responses(
        (status = 200, description = "Courses", body = [Course]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["courses"],
    operation_id = "listCourses",
    security(("SessionCookie" = []))
)]
#[get("/courses")]
pub async fn list_courses(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<Course>>> {
    session.require_admin()?;
    Ok(web::Json(state.registry_query.list_courses().await?))
}

/// Fetch one course.
#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = Course),
        (status = 400, description = "Malformed id", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown course", body = Error)
    ),
    tags = ["courses"],
    operation_id = "getCourse",
    security(("SessionCookie" = []))
)]
#[get("/courses/{id}")]
pub async fn get_course(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Course>> {
    session.require_admin()?;
    let course_id: CourseId = parse_id(&path, COURSE_ID)?;
    Ok(web::Json(state.registry_query.get_course(course_id).await?))
}

/// Replace a course's editable details.
#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    params(("id" = String, Path, description = "Course id")),
    request_body = CourseDetails,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown course", body = Error),
        (status = 409, description = "Concurrent modification", body = Error)
    ),
    tags = ["courses"],
    operation_id = "updateCourse",
    security(("SessionCookie" = []))
)]
#[put("/courses/{id}")]
pub async fn update_course(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<CourseDetails>,
) -> ApiResult<web::Json<Course>> {
    session.require_admin()?;
    let course_id: CourseId = parse_id(&path, COURSE_ID)?;
    let course = state
        .registry
        .update_course(course_id, payload.into_inner())
        .await?;
    Ok(web::Json(course))
}

/// Delete a course after removing it from every participant.
#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course deleted", body = CascadeReport),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown course", body = Error),
        (status = 503, description = "Cascade incomplete; course kept", body = Error)
    ),
    tags = ["courses"],
    operation_id = "deleteCourse",
    security(("SessionCookie" = []))
)]
#[delete("/courses/{id}")]
pub async fn delete_course(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<CascadeReport>> {
    session.require_admin()?;
    let course_id: CourseId = parse_id(&path, COURSE_ID)?;
    Ok(web::Json(state.enrollment.delete_course(course_id).await?))
}

/// Roster with capacity figures.
#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/roster",
    params(("id" = String, Path, description = "Course id")),
    responses(
        (status = 200, description = "Roster", body = CourseRoster),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown course", body = Error)
    ),
    tags = ["courses"],
    operation_id = "courseRoster",
    security(("SessionCookie" = []))
)]
#[get("/courses/{id}/roster")]
pub async fn course_roster(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<CourseRoster>> {
    session.require_admin()?;
    let course_id: CourseId = parse_id(&path, COURSE_ID)?;
    Ok(web::Json(state.read_model.course_roster(course_id).await?))
}

/// Seat a participant in a course.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/enroll",
    params(("id" = String, Path, description = "Course id")),
    request_body = EnrollRequestBody,
    responses(
        (status = 201, description = "Enrolled", body = EnrollmentOutcome),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown course or participant", body = Error),
        (status = 409, description = "Already enrolled, course full or participant inactive", body = Error),
        (status = 503, description = "Partial write; retry to repair", body = Error)
    ),
    tags = ["enrollments"],
    operation_id = "enroll",
    security(("SessionCookie" = []))
)]
#[post("/courses/{id}/enroll")]
pub async fn enroll(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<EnrollRequestBody>,
) -> ApiResult<HttpResponse> {
    session.require_admin()?;
    let course_id: CourseId = parse_id(&path, COURSE_ID)?;
    let participant_id: ParticipantId =
        require_id(payload.participant_id.as_deref(), PARTICIPANT_ID)?;
    let outcome = state
        .enrollment
        .enroll(EnrollmentRequest {
            participant_id,
            course_id,
        })
        .await?;
    Ok(HttpResponse::Created().json(outcome))
}

/// Withdraw a participant from a course.
#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}/enroll/{participantId}",
    params(
        ("id" = String, Path, description = "Course id"),
        ("participantId" = String, Path, description = "Participant id")
    ),
    responses(
        (status = 200, description = "Withdrawn", body = WithdrawalOutcome),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown course or participant", body = Error),
        (status = 409, description = "Not enrolled", body = Error)
    ),
    tags = ["enrollments"],
    operation_id = "withdraw",
    security(("SessionCookie" = []))
)]
#[delete("/courses/{id}/enroll/{participant_id}")]
pub async fn withdraw(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<WithdrawalOutcome>> {
    session.require_admin()?;
    let (course, participant) = path.into_inner();
    let course_id: CourseId = parse_id(&course, COURSE_ID)?;
    let participant_id: ParticipantId = parse_id(&participant, PARTICIPANT_ID)?;
    let outcome = state
        .enrollment
        .withdraw(EnrollmentRequest {
            participant_id,
            course_id,
        })
        .await?;
    Ok(web::Json(outcome))
}

#[cfg(test)]
#[path = "courses_tests.rs"]
mod tests;
