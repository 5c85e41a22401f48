//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP handler, the session cookie security
//! scheme and the tags used to group endpoints. Swagger UI serves it in
//! debug builds and `openapi-dump` prints it for external tooling.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::Error;
use crate::inbound::http::{auth, companies, courses, health, participants};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Training management API",
        description = "Courses, participants and companies with mirrored enrollments and affiliations."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        auth::login,
        auth::logout,
        auth::me,
        courses::create_course,
        courses::list_courses,
        courses::get_course,
        courses::update_course,
        courses::delete_course,
        courses::course_roster,
        courses::enroll,
        courses::withdraw,
        participants::create_participant,
        participants::list_participants,
        participants::participant_history,
        participants::get_participant,
        participants::update_participant,
        participants::delete_participant,
        participants::deactivate_participant,
        participants::set_enrollment_status,
        participants::attach_certificate,
        participants::revoke_certificate,
        companies::register_company,
        companies::list_companies,
        companies::companies_summary,
        companies::get_company,
        companies::update_company,
        companies::delete_company,
        companies::affiliate,
        companies::detach,
        companies::company_statistics,
        companies::course_statistics,
        companies::participants_by_course,
        companies::company_overview,
        health::ready,
        health::live,
    ),
    components(schemas(Error)),
    tags(
        (name = "auth", description = "Administrator session"),
        (name = "courses", description = "Course registry and rosters"),
        (name = "enrollments", description = "Seats, withdrawals and grades"),
        (name = "participants", description = "Participant registry and lifecycle"),
        (name = "certificates", description = "Certificate metadata"),
        (name = "companies", description = "Company registry"),
        (name = "affiliations", description = "Company membership"),
        (name = "reports", description = "Read models per company"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use utoipa::OpenApi;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    use super::*;

    #[rstest]
    #[case("/api/v1/courses/{id}/enroll")]
    #[case("/api/v1/participants/{id}/deactivate")]
    #[case("/api/v1/companies/{id}/overview")]
    #[case("/health/ready")]
    fn documents_routes(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing {path}");
    }

    #[test]
    fn error_schema_has_code_and_message() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error = schemas
            .iter()
            .find(|(name, _)| name.ends_with("Error"))
            .map(|(_, schema)| schema)
            .expect("Error schema");
        match error {
            RefOr::T(Schema::Object(obj)) => {
                assert!(obj.properties.contains_key("code"));
                assert!(obj.properties.contains_key("message"));
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[test]
    fn registers_session_cookie_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("SessionCookie"));
    }
}
