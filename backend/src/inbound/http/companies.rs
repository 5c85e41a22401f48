//! Company registry, affiliation and read-model endpoints.
//!
//! ```text
//! POST   /api/v1/companies
//! GET    /api/v1/companies
//! GET    /api/v1/companies/summary
//! GET    /api/v1/companies/{id}
//! PUT    /api/v1/companies/{id}
//! DELETE /api/v1/companies/{id}
//! POST   /api/v1/companies/{id}/participants {"participantId":"..."}
//! DELETE /api/v1/companies/{id}/participants/{participantId}
//! GET    /api/v1/companies/{id}/statistics
//! GET    /api/v1/companies/{id}/course-statistics
//! GET    /api/v1/companies/{id}/participants-by-course
//! GET    /api/v1/companies/{id}/overview
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{
    AffiliationOutcome, CompanyOverview, CompanyStatistics, CompanySummary, CompanyUpdate,
    CompanyUpdated, CourseStatistics, NewCompany, ParticipantsByCourse,
};
use crate::domain::{
    Company, CompanyId, CompanyName, CompanyProfile, CompanyStatus, Error, ParticipantId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, require_id};

const COMPANY_ID: FieldName = FieldName::new("id");
const PARTICIPANT_ID: FieldName = FieldName::new("participantId");

/// Request body for `POST /api/v1/companies`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCompanyBody {
    pub company_name: CompanyName,
    #[serde(flatten)]
    pub profile: CompanyProfile,
}

impl From<RegisterCompanyBody> for NewCompany {
    fn from(body: RegisterCompanyBody) -> Self {
        Self {
            name: body.company_name,
            profile: body.profile,
        }
    }
}

/// Request body for `PUT /api/v1/companies/{id}`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompanyBody {
    /// A changed name is propagated to every affiliate.
    pub company_name: CompanyName,
    #[serde(flatten)]
    pub profile: CompanyProfile,
    pub status: CompanyStatus,
}

impl From<UpdateCompanyBody> for CompanyUpdate {
    fn from(body: UpdateCompanyBody) -> Self {
        Self {
            name: body.company_name,
            profile: body.profile,
            status: body.status,
        }
    }
}

/// Request body for `POST /api/v1/companies/{id}/participants`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateRequestBody {
    pub participant_id: Option<String>,
}

fn company_id(raw: &str) -> ApiResult<CompanyId> {
    parse_id(raw, COMPANY_ID)
}

/// Register a company.
#[utoipa::path(
    post,
    path = "/api/v1/companies",
    request_body = RegisterCompanyBody,
    responses(
        (status = 201, description = "Company registered", body = Company),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 409, description = "Tax id already registered", body = Error)
    ),
    tags = ["companies"],
    operation_id = "registerCompany",
    security(("SessionCookie" = []))
)]
#[post("/companies")]
pub async fn register_company(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<RegisterCompanyBody>,
) -> ApiResult<HttpResponse> {
    session.require_admin()?;
    let company = state
        .registry
        .register_company(payload.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(company))
}

/// List every company.
#[utoipa::path(
    get,
    path = "/api/v1/companies",
    responses(
        (status = 200, description = "Companies", body = [Company]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["companies"],
    operation_id = "listCompanies",
    security(("SessionCookie" = []))
)]
#[get("/companies")]
pub async fn list_companies(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<Company>>> {
    session.require_admin()?;
    Ok(web::Json(state.registry_query.list_companies().await?))
}

/// Participant counts for every company.
#[utoipa::path(
    get,
    path = "/api/v1/companies/summary",
    responses(
        (status = 200, description = "Summary", body = [CompanySummary]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["reports"],
    operation_id = "companiesSummary",
    security(("SessionCookie" = []))
)]
#[get("/companies/summary")]
pub async fn companies_summary(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<CompanySummary>>> {
    session.require_admin()?;
    Ok(web::Json(state.read_model.companies_summary().await?))
}

/// Fetch one company.
#[utoipa::path(
    get,
    path = "/api/v1/companies/{id}",
    params(("id" = String, Path, description = "Company id")),
    responses(
        (status = 200, description = "Company", body = Company),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown company", body = Error)
    ),
    tags = ["companies"],
    operation_id = "getCompany",
    security(("SessionCookie" = []))
)]
#[get("/companies/{id}")]
pub async fn get_company(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Company>> {
    session.require_admin()?;
    let company_id = company_id(&path)?;
    Ok(web::Json(state.registry_query.get_company(company_id).await?))
}

/// Replace company details; a new name is copied onto affiliates.
#[utoipa::path(
    put,
    path = "/api/v1/companies/{id}",
    params(("id" = String, Path, description = "Company id")),
    request_body = UpdateCompanyBody,
    responses(
        (status = 200, description = "Company updated", body = CompanyUpdated),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown company", body = Error),
        (status = 409, description = "Tax id already registered", body = Error)
    ),
    tags = ["companies"],
    operation_id = "updateCompany",
    security(("SessionCookie" = []))
)]
#[put("/companies/{id}")]
pub async fn update_company(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<UpdateCompanyBody>,
) -> ApiResult<web::Json<CompanyUpdated>> {
    session.require_admin()?;
    let company_id = company_id(&path)?;
    let updated = state
        .registry
        .update_company(company_id, payload.into_inner().into())
        .await?;
    Ok(web::Json(updated))
}

/// Delete a company without affiliates.
#[utoipa::path(
    delete,
    path = "/api/v1/companies/{id}",
    params(("id" = String, Path, description = "Company id")),
    responses(
        (status = 204, description = "Company deleted"),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown company", body = Error),
        (status = 409, description = "Company still has affiliates", body = Error)
    ),
    tags = ["companies"],
    operation_id = "deleteCompany",
    security(("SessionCookie" = []))
)]
#[delete("/companies/{id}")]
pub async fn delete_company(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    session.require_admin()?;
    let company_id = company_id(&path)?;
    state.affiliation.delete_company(company_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Link a participant to the company.
#[utoipa::path(
    post,
    path = "/api/v1/companies/{id}/participants",
    params(("id" = String, Path, description = "Company id")),
    request_body = AffiliateRequestBody,
    responses(
        (status = 200, description = "Affiliated", body = AffiliationOutcome),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown company or participant", body = Error),
        (status = 409, description = "Affiliated elsewhere", body = Error)
    ),
    tags = ["affiliations"],
    operation_id = "affiliate",
    security(("SessionCookie" = []))
)]
#[post("/companies/{id}/participants")]
pub async fn affiliate(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<AffiliateRequestBody>,
) -> ApiResult<web::Json<AffiliationOutcome>> {
    session.require_admin()?;
    let company_id = company_id(&path)?;
    let participant_id: ParticipantId =
        require_id(payload.participant_id.as_deref(), PARTICIPANT_ID)?;
    let outcome = state
        .affiliation
        .affiliate(company_id, participant_id)
        .await?;
    Ok(web::Json(outcome))
}

/// Remove the link between a participant and the company.
#[utoipa::path(
    delete,
    path = "/api/v1/companies/{id}/participants/{participantId}",
    params(
        ("id" = String, Path, description = "Company id"),
        ("participantId" = String, Path, description = "Participant id")
    ),
    responses(
        (status = 200, description = "Detached", body = AffiliationOutcome),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown company or participant", body = Error),
        (status = 409, description = "Not affiliated", body = Error)
    ),
    tags = ["affiliations"],
    operation_id = "detach",
    security(("SessionCookie" = []))
)]
#[delete("/companies/{id}/participants/{participant_id}")]
pub async fn detach(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<AffiliationOutcome>> {
    session.require_admin()?;
    let (company, participant) = path.into_inner();
    let company_id = company_id(&company)?;
    let participant_id: ParticipantId = parse_id(&participant, PARTICIPANT_ID)?;
    let outcome = state.affiliation.detach(company_id, participant_id).await?;
    Ok(web::Json(outcome))
}

/// Enrollment totals across the company's affiliates.
#[utoipa::path(
    get,
    path = "/api/v1/companies/{id}/statistics",
    params(("id" = String, Path, description = "Company id")),
    responses(
        (status = 200, description = "Statistics", body = CompanyStatistics),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown company", body = Error)
    ),
    tags = ["reports"],
    operation_id = "companyStatistics",
    security(("SessionCookie" = []))
)]
#[get("/companies/{id}/statistics")]
pub async fn company_statistics(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<CompanyStatistics>> {
    session.require_admin()?;
    let company_id = company_id(&path)?;
    Ok(web::Json(
        state.read_model.company_statistics(company_id).await?,
    ))
}

/// Per-course totals across the company's affiliates.
#[utoipa::path(
    get,
    path = "/api/v1/companies/{id}/course-statistics",
    params(("id" = String, Path, description = "Company id")),
    responses(
        (status = 200, description = "Per-course statistics", body = CourseStatistics),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown company", body = Error)
    ),
    tags = ["reports"],
    operation_id = "courseStatistics",
    security(("SessionCookie" = []))
)]
#[get("/companies/{id}/course-statistics")]
pub async fn course_statistics(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<CourseStatistics>> {
    session.require_admin()?;
    let company_id = company_id(&path)?;
    Ok(web::Json(
        state.read_model.course_statistics(company_id).await?,
    ))
}

/// Affiliates grouped by course.
#[utoipa::path(
    get,
    path = "/api/v1/companies/{id}/participants-by-course",
    params(("id" = String, Path, description = "Company id")),
    responses(
        (status = 200, description = "Grouped affiliates", body = ParticipantsByCourse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown company", body = Error)
    ),
    tags = ["reports"],
    operation_id = "participantsByCourse",
    security(("SessionCookie" = []))
)]
#[get("/companies/{id}/participants-by-course")]
pub async fn participants_by_course(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ParticipantsByCourse>> {
    session.require_admin()?;
    let company_id = company_id(&path)?;
    Ok(web::Json(
        state.read_model.participants_by_course(company_id).await?,
    ))
}

/// Company with affiliates, resolved enrollments and headline numbers.
#[utoipa::path(
    get,
    path = "/api/v1/companies/{id}/overview",
    params(("id" = String, Path, description = "Company id")),
    responses(
        (status = 200, description = "Overview", body = CompanyOverview),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown company", body = Error)
    ),
    tags = ["reports"],
    operation_id = "companyOverview",
    security(("SessionCookie" = []))
)]
#[get("/companies/{id}/overview")]
pub async fn company_overview(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<CompanyOverview>> {
    session.require_admin()?;
    let company_id = company_id(&path)?;
    Ok(web::Json(state.read_model.company_overview(company_id).await?))
}

#[cfg(test)]
#[path = "companies_tests.rs"]
mod tests;
