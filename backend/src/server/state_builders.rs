//! Builders for the HTTP state: stores, login and the wired services.
//!
//! With all three collection URLs configured the Diesel document stores are
//! used, each behind its own pool after pending migrations ran. Otherwise
//! the in-memory stores back the process and nothing survives a restart.

use std::io;
use std::sync::Arc;

use mockable::Clock;
use tracing::{info, warn};

use training_backend::domain::TrainingStores;
use training_backend::domain::ports::{FixtureLoginService, LoginService};
use training_backend::inbound::http::state::HttpState;
use training_backend::outbound::login::ConfiguredLoginService;
use training_backend::outbound::memory::{
    InMemoryCompanyRepository, InMemoryCourseRepository, InMemoryParticipantRepository,
};
use training_backend::outbound::persistence::{
    DbPool, DieselCompanyRepository, DieselCourseRepository, DieselParticipantRepository,
    PoolConfig, run_pending_migrations,
};
use training_backend::settings::ServerSettings;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    io::Error::other(format!("{context}: {err}"))
}

/// Choose the login service from the configured credentials.
///
/// Release builds refuse to start without credentials; the fixture login
/// accepts a well-known pair.
pub fn build_login(settings: &ServerSettings) -> io::Result<Arc<dyn LoginService>> {
    let credentials = settings
        .admin_credentials()
        .map_err(|err| startup_error("admin credentials", err))?;
    match credentials {
        Some(credentials) => {
            let service = ConfiguredLoginService::new(
                credentials.admin_id,
                &credentials.email,
                &credentials.password_sha256,
            )
            .map_err(|err| startup_error("admin credentials", err))?;
            Ok(Arc::new(service))
        }
        None if cfg!(debug_assertions) => {
            warn!("no admin credentials configured; using fixture login (dev only)");
            Ok(Arc::new(FixtureLoginService))
        }
        None => Err(io::Error::other(
            "admin credentials are required: set TRAINING_ADMIN_EMAIL and TRAINING_ADMIN_PASSWORD_SHA256",
        )),
    }
}

async fn connect_collection(
    collection: &'static str,
    database_url: &str,
    max_size: u32,
) -> io::Result<DbPool> {
    let applied = run_pending_migrations(database_url)
        .await
        .map_err(|err| startup_error(collection, err))?;
    info!(collection, applied, "migrations applied");
    DbPool::new(PoolConfig::new(collection, database_url).with_max_size(max_size))
        .await
        .map_err(|err| startup_error(collection, err))
}

/// Wire every service over the configured stores.
///
/// # Errors
/// Returns [`io::Error`] when the settings are inconsistent, migrations fail
/// or a pool cannot be built.
pub async fn build_http_state(
    settings: &ServerSettings,
    clock: Arc<dyn Clock>,
) -> io::Result<HttpState> {
    let login = build_login(settings)?;
    let urls = settings
        .database_urls()
        .map_err(|err| startup_error("database settings", err))?;
    let io_timeout = settings.io_timeout();
    let retry_limit = settings.retry_limit();

    match urls {
        Some(urls) => {
            let max_size = settings.pool_max_size();
            let courses = connect_collection("courses", &urls.courses, max_size).await?;
            let participants =
                connect_collection("participants", &urls.participants, max_size).await?;
            let companies = connect_collection("companies", &urls.companies, max_size).await?;
            let stores = TrainingStores::new(
                Arc::new(DieselCourseRepository::new(courses)),
                Arc::new(DieselParticipantRepository::with_clock(
                    participants,
                    Arc::clone(&clock),
                )),
                Arc::new(DieselCompanyRepository::new(companies)),
            )
            .with_io_timeout(io_timeout);
            info!("using PostgreSQL document stores");
            Ok(HttpState::wire(stores, clock, login, retry_limit))
        }
        None => {
            warn!("no database configured; using in-memory stores");
            let stores = TrainingStores::new(
                Arc::new(InMemoryCourseRepository::new()),
                Arc::new(InMemoryParticipantRepository::with_clock(Arc::clone(&clock))),
                Arc::new(InMemoryCompanyRepository::new()),
            )
            .with_io_timeout(io_timeout);
            Ok(HttpState::wire(stores, clock, login, retry_limit))
        }
    }
}
