//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::ServerConfig;
pub use state_builders::build_http_state;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::Key;
use actix_web::cookie::SameSite;
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use training_backend::Trace;
#[cfg(debug_assertions)]
use training_backend::doc::ApiDoc;
use training_backend::inbound::http::error::{
    json_error_handler, path_error_handler, query_error_handler,
};
use training_backend::inbound::http::health::{HealthState, live, ready};
use training_backend::inbound::http::state::HttpState;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
        same_site,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build();

    let api = web::scope("/api/v1")
        .wrap(session)
        .configure(training_backend::inbound::http::configure);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let ServerConfig {
        key,
        cookie_secure,
        same_site,
        bind_addr,
        http_state,
    } = config;
    let http_state = web::Data::new(http_state);

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            key: key.clone(),
            cookie_secure,
            same_site,
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use mockable::DefaultClock;
    use std::sync::Arc;

    use training_backend::domain::TrainingStores;
    use training_backend::domain::ports::FixtureLoginService;
    use training_backend::outbound::memory::{
        InMemoryCompanyRepository, InMemoryCourseRepository, InMemoryParticipantRepository,
    };

    use super::*;

    fn deps() -> AppDependencies {
        let stores = TrainingStores::new(
            Arc::new(InMemoryCourseRepository::new()),
            Arc::new(InMemoryParticipantRepository::new()),
            Arc::new(InMemoryCompanyRepository::new()),
        );
        AppDependencies {
            health_state: web::Data::new(HealthState::new()),
            http_state: web::Data::new(HttpState::wire(
                stores,
                Arc::new(DefaultClock),
                Arc::new(FixtureLoginService),
                3,
            )),
            key: Key::generate(),
            cookie_secure: false,
            same_site: SameSite::Lax,
        }
    }

    #[actix_web::test]
    async fn api_requires_a_session_and_probes_do_not() {
        let deps = deps();
        deps.health_state.mark_ready();
        let app = test::init_service(build_app(deps)).await;

        let courses = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/v1/courses").to_request(),
        )
        .await;
        assert_eq!(courses.status(), StatusCode::UNAUTHORIZED);
        assert!(courses.headers().contains_key("trace-id"));

        let liveness = test::call_service(
            &app,
            test::TestRequest::get().uri("/health/live").to_request(),
        )
        .await;
        assert_eq!(liveness.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn login_then_list_courses() {
        let app = test::init_service(build_app(deps())).await;

        let login = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/login")
                .set_json(serde_json::json!({
                    "email": "admin@example.com",
                    "password": "password"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(login.status(), StatusCode::OK);
        let cookie = login
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie")
            .into_owned();

        let courses = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/courses")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(courses.status(), StatusCode::OK);
    }
}
