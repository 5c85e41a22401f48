//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};
use mockable::DefaultClock;

use super::error::{json_error_handler, path_error_handler, query_error_handler};
use super::state::HttpState;
use crate::domain::TrainingStores;
use crate::domain::ports::FixtureLoginService;
use crate::outbound::memory::{
    InMemoryCompanyRepository, InMemoryCourseRepository, InMemoryParticipantRepository,
};
use crate::test_support::{FaultPlan, faulty_stores};

/// Build a session middleware configured for tests.
///
/// Generates a fresh key per invocation, names the cookie `session` and
/// disables the `Secure` flag for plain HTTP.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Extract the session cookie set by a response.
pub fn session_cookie(res: &ServiceResponse) -> Cookie<'static> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned)
        .expect("session cookie set")
}

/// Handler state over fresh in-memory stores and the fixture login.
pub fn memory_state() -> HttpState {
    let stores = TrainingStores::new(
        Arc::new(InMemoryCourseRepository::new()),
        Arc::new(InMemoryParticipantRepository::new()),
        Arc::new(InMemoryCompanyRepository::new()),
    );
    HttpState::wire(
        stores,
        Arc::new(DefaultClock),
        Arc::new(FixtureLoginService),
        3,
    )
}

/// Handler state over in-memory stores that fail according to the returned
/// plan.
pub fn faulty_state() -> (HttpState, Arc<FaultPlan>) {
    let (stores, plan) = faulty_stores(Arc::new(DefaultClock));
    let state = HttpState::wire(
        stores,
        Arc::new(DefaultClock),
        Arc::new(FixtureLoginService),
        3,
    );
    (state, plan)
}

/// The full `/api/v1` surface wrapped in a test session middleware.
pub fn test_app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .wrap(test_session_middleware())
        .service(web::scope("/api/v1").configure(super::configure))
}

/// `POST /api/v1/login` with the fixture administrator.
pub fn admin_login() -> actix_web::test::TestRequest {
    actix_web::test::TestRequest::post()
        .uri("/api/v1/login")
        .set_json(serde_json::json!({
            "email": "admin@example.com",
            "password": "password",
        }))
}
