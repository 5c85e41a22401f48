//! Administrator login, logout and identity endpoints.
//!
//! ```text
//! POST /api/v1/login {"email":"admin@example.com","password":"password"}
//! POST /api/v1/logout
//! GET  /api/v1/me
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

use crate::domain::{AdminId, Error, LoginCredentials, LoginValidationError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Login request body for `POST /api/v1/login`.
#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl TryFrom<LoginRequest> for LoginCredentials {
    type Error = LoginValidationError;

    fn try_from(value: LoginRequest) -> Result<Self, Self::Error> {
        Self::try_from_parts(&value.email, &value.password)
    }
}

/// Identity of the logged-in administrator.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminIdentity {
    pub admin_id: AdminId,
}

fn map_login_validation_error(err: LoginValidationError) -> Error {
    match err {
        LoginValidationError::EmptyEmail => Error::invalid_request("email must not be empty")
            .with_details(json!({ "field": "email", "code": "empty_email" })),
        LoginValidationError::EmptyPassword => Error::invalid_request("password must not be empty")
            .with_details(json!({ "field": "password", "code": "empty_password" })),
    }
}

/// Authenticate an administrator and establish a session.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = AdminIdentity,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Invalid credentials", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<AdminIdentity>> {
    let credentials =
        LoginCredentials::try_from(payload.into_inner()).map_err(map_login_validation_error)?;
    let admin_id = state.login.authenticate(&credentials).await?;
    session.persist_admin(&admin_id)?;
    info!(%admin_id, "administrator logged in");
    Ok(web::Json(AdminIdentity { admin_id }))
}

/// Drop the session cookie.
#[utoipa::path(
    post,
    path = "/api/v1/logout",
    responses((status = 204, description = "Session cleared")),
    tags = ["auth"],
    operation_id = "logout"
)]
#[post("/logout")]
pub async fn logout(session: SessionContext) -> HttpResponse {
    session.purge();
    HttpResponse::NoContent().finish()
}

/// Return the logged-in administrator.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Current administrator", body = AdminIdentity),
        (status = 401, description = "Not logged in", body = Error)
    ),
    tags = ["auth"],
    operation_id = "currentAdmin"
)]
#[get("/me")]
pub async fn me(session: SessionContext) -> ApiResult<web::Json<AdminIdentity>> {
    let admin_id = session.require_admin()?;
    Ok(web::Json(AdminIdentity { admin_id }))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use rstest::rstest;
    use serde_json::Value;

    use super::*;
    use crate::domain::ports::FIXTURE_ADMIN_ID;
    use crate::inbound::http::test_utils::{memory_state, session_cookie, test_app};

    fn login_request(email: &str, password: &str) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/v1/login")
            .set_json(LoginRequest {
                email: email.to_owned(),
                password: password.to_owned(),
            })
    }

    #[actix_web::test]
    async fn login_then_me_returns_the_admin() {
        let app = test::init_service(test_app(memory_state())).await;

        let res = test::call_service(
            &app,
            login_request("Admin@Example.com ", "password").to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = session_cookie(&res);

        let current_admin = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/me")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(current_admin.status(), StatusCode::OK);
        let body: Value = test::read_body_json(current_admin).await;
        assert_eq!(body.get("adminId"), Some(&Value::from(FIXTURE_ADMIN_ID)));
    }

    #[actix_web::test]
    async fn wrong_password_is_unauthorised() {
        let app = test::init_service(test_app(memory_state())).await;

        let res = test::call_service(
            &app,
            login_request("admin@example.com", "hunter2").to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(res.response().cookies().next().is_none());
    }

    #[rstest]
    #[case("", "password", "email", "empty_email")]
    #[case("admin@example.com", "", "password", "empty_password")]
    #[actix_web::test]
    async fn blank_fields_are_rejected(
        #[case] email: &str,
        #[case] password: &str,
        #[case] field: &str,
        #[case] code: &str,
    ) {
        let app = test::init_service(test_app(memory_state())).await;

        let res = test::call_service(&app, login_request(email, password).to_request()).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Error = test::read_body_json(res).await;
        let details = body.details().expect("details");
        assert_eq!(details.get("field"), Some(&Value::from(field)));
        assert_eq!(details.get("code"), Some(&Value::from(code)));
    }

    #[actix_web::test]
    async fn logout_forgets_the_admin() {
        let app = test::init_service(test_app(memory_state())).await;
        let res = test::call_service(
            &app,
            login_request("admin@example.com", "password").to_request(),
        )
        .await;
        let cookie = session_cookie(&res);

        let out = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/logout")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(out.status(), StatusCode::NO_CONTENT);
        let cleared = session_cookie(&out);

        let current_admin = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/me")
                .cookie(cleared)
                .to_request(),
        )
        .await;
        assert_eq!(current_admin.status(), StatusCode::UNAUTHORIZED);
    }
}
