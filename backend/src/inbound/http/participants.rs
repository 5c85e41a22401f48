//! Participant registry, lifecycle, grading and certificate endpoints.
//!
//! ```text
//! POST   /api/v1/participants
//! GET    /api/v1/participants?status=active
//! GET    /api/v1/participants/history
//! GET    /api/v1/participants/{id}
//! PUT    /api/v1/participants/{id}
//! DELETE /api/v1/participants/{id}
//! POST   /api/v1/participants/{id}/deactivate
//! PUT    /api/v1/participants/{id}/courses/{courseId}/status
//! POST   /api/v1/participants/{id}/certificates
//! DELETE /api/v1/participants/{id}/certificates/{publicId}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{
    CertificateUpload, DeactivationReport, EnrollmentStatusUpdate, NewParticipant,
};
use crate::domain::{
    CascadeReport, Certificate, CompanyId, CourseId, Enrollment, EnrollmentStatus, Error,
    Participant, ParticipantId, ParticipantProfile, ParticipantStatus, Score,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_field_error, missing_field_error, parse_id,
    parse_optional_rfc3339_timestamp,
};

const PARTICIPANT_ID: FieldName = FieldName::new("id");
const COURSE_ID: FieldName = FieldName::new("courseId");
const COMPANY_ID: FieldName = FieldName::new("companyId");
const SCORE: FieldName = FieldName::new("score");
const PUBLIC_ID: FieldName = FieldName::new("publicId");
const UPLOADED_AT: FieldName = FieldName::new("uploadedAt");

/// Request body for `POST /api/v1/participants`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateParticipantBody {
    #[serde(flatten)]
    pub profile: ParticipantProfile,
    /// Company to affiliate with on creation.
    pub company_id: Option<String>,
}

impl TryFrom<CreateParticipantBody> for NewParticipant {
    type Error = Error;

    fn try_from(body: CreateParticipantBody) -> Result<Self, Self::Error> {
        let company_id = body
            .company_id
            .as_deref()
            .map(|raw| parse_id::<CompanyId>(raw, COMPANY_ID))
            .transpose()?;
        Ok(Self {
            profile: body.profile,
            company_id,
        })
    }
}

/// Query string for `GET /api/v1/participants`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParticipantsQuery {
    /// Only participants in this state.
    pub status: Option<ParticipantStatus>,
}

/// Request body for grading an enrollment.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentStatusBody {
    pub status: EnrollmentStatus,
    /// 0 to 100.
    pub score: Option<f64>,
    pub notes: Option<String>,
}

/// Metadata of a certificate already stored by the file collaborator.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateBody {
    pub public_id: Option<String>,
    pub url: String,
    pub file_name: String,
    pub category: Option<String>,
    /// RFC 3339; defaults to now.
    pub uploaded_at: Option<String>,
}

impl TryFrom<CertificateBody> for CertificateUpload {
    type Error = Error;

    fn try_from(body: CertificateBody) -> Result<Self, Self::Error> {
        let public_id = body
            .public_id
            .filter(|raw| !raw.trim().is_empty())
            .ok_or_else(|| missing_field_error(PUBLIC_ID))?;
        let uploaded_at = parse_optional_rfc3339_timestamp(body.uploaded_at.as_deref(), UPLOADED_AT)?;
        Ok(Self {
            public_id,
            url: body.url,
            file_name: body.file_name,
            category: body.category,
            uploaded_at,
        })
    }
}

/// Register a participant, optionally affiliating them.
#[utoipa::path(
    post,
    path = "/api/v1/participants",
    request_body = CreateParticipantBody,
    responses(
        (status = 201, description = "Participant created", body = Participant),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown company", body = Error),
        (status = 409, description = "Email already registered", body = Error)
    ),
    tags = ["participants"],
    operation_id = "createParticipant",
    security(("SessionCookie" = []))
)]
#[post("/participants")]
pub async fn create_participant(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateParticipantBody>,
) -> ApiResult<HttpResponse> {
    session.require_admin()?;
    let new = NewParticipant::try_from(payload.into_inner())?;
    let participant = state.registry.create_participant(new).await?;
    Ok(HttpResponse::Created().json(participant))
}

/// List participants, optionally by status.
#[utoipa::path(
    get,
    path = "/api/v1/participants",
    params(ListParticipantsQuery),
    responses(
        (status = 200, description = "Participants", body = [Participant]),
        (status = 400, description = "Unknown status", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["participants"],
    operation_id = "listParticipants",
    security(("SessionCookie" = []))
)]
#[get("/participants")]
pub async fn list_participants(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<ListParticipantsQuery>,
) -> ApiResult<web::Json<Vec<Participant>>> {
    session.require_admin()?;
    let participants = state.registry_query.list_participants(query.status).await?;
    Ok(web::Json(participants))
}

/// Deactivated participants, most recent first.
#[utoipa::path(
    get,
    path = "/api/v1/participants/history",
    responses(
        (status = 200, description = "Inactive participants", body = [Participant]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["participants"],
    operation_id = "participantHistory",
    security(("SessionCookie" = []))
)]
#[get("/participants/history")]
pub async fn participant_history(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<Participant>>> {
    session.require_admin()?;
    Ok(web::Json(state.registry_query.participant_history().await?))
}

/// Fetch one participant.
#[utoipa::path(
    get,
    path = "/api/v1/participants/{id}",
    params(("id" = String, Path, description = "Participant id")),
    responses(
        (status = 200, description = "Participant", body = Participant),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown participant", body = Error)
    ),
    tags = ["participants"],
    operation_id = "getParticipant",
    security(("SessionCookie" = []))
)]
#[get("/participants/{id}")]
pub async fn get_participant(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Participant>> {
    session.require_admin()?;
    let participant_id: ParticipantId = parse_id(&path, PARTICIPANT_ID)?;
    Ok(web::Json(
        state.registry_query.get_participant(participant_id).await?,
    ))
}

/// Replace personal and contact fields.
#[utoipa::path(
    put,
    path = "/api/v1/participants/{id}",
    params(("id" = String, Path, description = "Participant id")),
    request_body = ParticipantProfile,
    responses(
        (status = 200, description = "Participant updated", body = Participant),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown participant", body = Error),
        (status = 409, description = "Email already registered", body = Error)
    ),
    tags = ["participants"],
    operation_id = "updateParticipant",
    security(("SessionCookie" = []))
)]
#[put("/participants/{id}")]
pub async fn update_participant(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<ParticipantProfile>,
) -> ApiResult<web::Json<Participant>> {
    session.require_admin()?;
    let participant_id: ParticipantId = parse_id(&path, PARTICIPANT_ID)?;
    let participant = state
        .registry
        .update_participant(participant_id, payload.into_inner())
        .await?;
    Ok(web::Json(participant))
}

/// Remove a participant after stripping every mirror.
#[utoipa::path(
    delete,
    path = "/api/v1/participants/{id}",
    params(("id" = String, Path, description = "Participant id")),
    responses(
        (status = 200, description = "Participant deleted", body = CascadeReport),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown participant", body = Error),
        (status = 503, description = "Cascade incomplete; participant kept", body = Error)
    ),
    tags = ["participants"],
    operation_id = "deleteParticipant",
    security(("SessionCookie" = []))
)]
#[delete("/participants/{id}")]
pub async fn delete_participant(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<CascadeReport>> {
    session.require_admin()?;
    let participant_id: ParticipantId = parse_id(&path, PARTICIPANT_ID)?;
    Ok(web::Json(
        state.lifecycle.delete_participant(participant_id).await?,
    ))
}

/// Soft-delete a participant and flip their mirrors.
#[utoipa::path(
    post,
    path = "/api/v1/participants/{id}/deactivate",
    params(("id" = String, Path, description = "Participant id")),
    responses(
        (status = 200, description = "Participant deactivated", body = DeactivationReport),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown participant", body = Error),
        (status = 409, description = "Already inactive", body = Error)
    ),
    tags = ["participants"],
    operation_id = "deactivateParticipant",
    security(("SessionCookie" = []))
)]
#[post("/participants/{id}/deactivate")]
pub async fn deactivate_participant(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<DeactivationReport>> {
    session.require_admin()?;
    let participant_id: ParticipantId = parse_id(&path, PARTICIPANT_ID)?;
    Ok(web::Json(
        state.lifecycle.deactivate_participant(participant_id).await?,
    ))
}

/// Grade or re-status one enrollment.
#[utoipa::path(
    put,
    path = "/api/v1/participants/{id}/courses/{courseId}/status",
    params(
        ("id" = String, Path, description = "Participant id"),
        ("courseId" = String, Path, description = "Course id")
    ),
    request_body = EnrollmentStatusBody,
    responses(
        (status = 200, description = "Enrollment updated", body = Enrollment),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown participant or course", body = Error),
        (status = 409, description = "Not enrolled", body = Error)
    ),
    tags = ["enrollments"],
    operation_id = "setEnrollmentStatus",
    security(("SessionCookie" = []))
)]
#[put("/participants/{id}/courses/{course_id}/status")]
pub async fn set_enrollment_status(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
    payload: web::Json<EnrollmentStatusBody>,
) -> ApiResult<web::Json<Enrollment>> {
    session.require_admin()?;
    let (participant, course) = path.into_inner();
    let participant_id: ParticipantId = parse_id(&participant, PARTICIPANT_ID)?;
    let course_id: CourseId = parse_id(&course, COURSE_ID)?;
    let EnrollmentStatusBody {
        status,
        score,
        notes,
    } = payload.into_inner();
    let score = score
        .map(Score::new)
        .transpose()
        .map_err(|err| invalid_field_error(SCORE, err.to_string()))?;
    let enrollment = state
        .enrollment
        .set_enrollment_status(EnrollmentStatusUpdate {
            participant_id,
            course_id,
            status,
            score,
            notes,
        })
        .await?;
    Ok(web::Json(enrollment))
}

/// Record a stored certificate against a participant.
#[utoipa::path(
    post,
    path = "/api/v1/participants/{id}/certificates",
    params(("id" = String, Path, description = "Participant id")),
    request_body = CertificateBody,
    responses(
        (status = 201, description = "Certificate attached", body = Certificate),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown participant", body = Error)
    ),
    tags = ["certificates"],
    operation_id = "attachCertificate",
    security(("SessionCookie" = []))
)]
#[post("/participants/{id}/certificates")]
pub async fn attach_certificate(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<CertificateBody>,
) -> ApiResult<HttpResponse> {
    session.require_admin()?;
    let participant_id: ParticipantId = parse_id(&path, PARTICIPANT_ID)?;
    let upload = CertificateUpload::try_from(payload.into_inner())?;
    let certificate = state
        .registry
        .attach_certificate(participant_id, upload)
        .await?;
    Ok(HttpResponse::Created().json(certificate))
}

/// Mark a certificate as revoked.
#[utoipa::path(
    delete,
    path = "/api/v1/participants/{id}/certificates/{publicId}",
    params(
        ("id" = String, Path, description = "Participant id"),
        ("publicId" = String, Path, description = "Storage id of the certificate")
    ),
    responses(
        (status = 200, description = "Certificate revoked", body = Certificate),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown participant or certificate", body = Error)
    ),
    tags = ["certificates"],
    operation_id = "revokeCertificate",
    security(("SessionCookie" = []))
)]
#[delete("/participants/{id}/certificates/{public_id}")]
pub async fn revoke_certificate(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<Certificate>> {
    session.require_admin()?;
    let (participant, public_id) = path.into_inner();
    let participant_id: ParticipantId = parse_id(&participant, PARTICIPANT_ID)?;
    let certificate = state
        .registry
        .revoke_certificate(participant_id, public_id)
        .await?;
    Ok(web::Json(certificate))
}

#[cfg(test)]
#[path = "participants_tests.rs"]
mod tests;
