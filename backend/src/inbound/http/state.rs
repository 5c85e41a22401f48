//! Shared HTTP adapter state.
//!
//! Handlers receive this via `actix_web::web::Data` and only see driving
//! ports, so they stay testable without I/O.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{
    AffiliationCommand, CompanyRepository, CourseRepository, EnrollmentCommand, LifecycleCommand,
    LoginService, ParticipantRepository, RegistryCommand, RegistryQuery, TrainingReadModel,
};
use crate::domain::{
    AffiliationManager, EnrollmentCoordinator, LifecycleManager, ReadModelBuilder, RegistryService,
    TrainingStores,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub login: Arc<dyn LoginService>,
    pub registry: Arc<dyn RegistryCommand>,
    pub registry_query: Arc<dyn RegistryQuery>,
    pub enrollment: Arc<dyn EnrollmentCommand>,
    pub affiliation: Arc<dyn AffiliationCommand>,
    pub lifecycle: Arc<dyn LifecycleCommand>,
    pub read_model: Arc<dyn TrainingReadModel>,
}

impl HttpState {
    /// Wire every training service over one set of stores.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use mockable::DefaultClock;
    /// use training_backend::domain::TrainingStores;
    /// use training_backend::domain::ports::FixtureLoginService;
    /// use training_backend::inbound::http::state::HttpState;
    /// use training_backend::outbound::memory::{
    ///     InMemoryCompanyRepository, InMemoryCourseRepository, InMemoryParticipantRepository,
    /// };
    ///
    /// let stores = TrainingStores::new(
    ///     Arc::new(InMemoryCourseRepository::new()),
    ///     Arc::new(InMemoryParticipantRepository::new()),
    ///     Arc::new(InMemoryCompanyRepository::new()),
    /// );
    /// let state = HttpState::wire(stores, Arc::new(DefaultClock), Arc::new(FixtureLoginService), 3);
    /// let _registry = state.registry.clone();
    /// ```
    pub fn wire<C, P, K>(
        stores: TrainingStores<C, P, K>,
        clock: Arc<dyn Clock>,
        login: Arc<dyn LoginService>,
        retry_limit: u32,
    ) -> Self
    where
        C: CourseRepository + ?Sized + 'static,
        P: ParticipantRepository + ?Sized + 'static,
        K: CompanyRepository + ?Sized + 'static,
    {
        let affiliation: Arc<dyn AffiliationCommand> = Arc::new(
            AffiliationManager::new(stores.clone(), Arc::clone(&clock))
                .with_retry_limit(retry_limit),
        );
        let registry = Arc::new(
            RegistryService::new(stores.clone(), Arc::clone(&clock), Arc::clone(&affiliation))
                .with_retry_limit(retry_limit),
        );
        Self {
            login,
            registry: Arc::clone(&registry) as Arc<dyn RegistryCommand>,
            registry_query: registry,
            enrollment: Arc::new(
                EnrollmentCoordinator::new(stores.clone(), Arc::clone(&clock))
                    .with_retry_limit(retry_limit),
            ),
            affiliation,
            lifecycle: Arc::new(
                LifecycleManager::new(stores.clone(), clock).with_retry_limit(retry_limit),
            ),
            read_model: Arc::new(ReadModelBuilder::new(stores)),
        }
    }
}
