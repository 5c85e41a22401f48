//! Domain primitives, aggregates and services.
//!
//! Purpose: define the three training aggregates (Course, Participant,
//! Company), the value types they embed, and the services that keep the
//! mirrored relationships between them consistent. Nothing here knows about
//! HTTP or SQL; adapters reach the domain through [`ports`].
//!
//! Public surface:
//! - Error (alias to `error::Error`): transport-agnostic error payload.
//! - TrainingError: failure taxonomy of the training services.
//! - Course, Participant, Company: aggregates with their embedded mirrors.
//! - EnrollmentCoordinator, AffiliationManager, LifecycleManager,
//!   ReadModelBuilder, RegistryService: driving-port implementations.

pub mod affiliation_manager;
pub mod auth;
pub mod cascade;
pub mod company;
pub mod contact;
pub mod course;
pub mod enrollment;
pub mod enrollment_coordinator;
pub mod error;
pub mod ids;
pub mod lifecycle_manager;
mod mirrors;
pub mod participant;
pub mod ports;
pub mod read_model_builder;
pub mod registry_service;
pub mod stores;
pub mod trace_id;
pub mod training_error;

pub use self::affiliation_manager::AffiliationManager;
pub use self::auth::{LoginCredentials, LoginValidationError};
pub use self::cascade::{AggregateKind, AggregateRef, CascadeEntry, CascadeOutcome, CascadeReport};
pub use self::company::{
    Affiliate, AffiliateStatus, Company, CompanyContact, CompanyName, CompanyProfile,
    CompanyStatus, CompanyValidationError,
};
pub use self::contact::{
    ContactValidationError, Curp, EmailAddress, MUNICIPALITIES, Municipality, TaxId,
};
pub use self::course::{
    Course, CourseDetails, CourseKind, CourseValidationError, UnknownCourseKind,
};
pub use self::enrollment::{
    Enrollment, EnrollmentStatus, RosterEntry, Score, ScoreOutOfRange, UnknownEnrollmentStatus,
};
pub use self::enrollment_coordinator::EnrollmentCoordinator;
pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::ids::{AdminId, CompanyId, CourseId, IdValidationError, ParticipantId};
pub use self::lifecycle_manager::LifecycleManager;
pub use self::participant::{
    Certificate, CertificateStatus, CompanyLink, MAX_AGE, MIN_AGE, Participant,
    ParticipantProfile, ParticipantStatus, ParticipantValidationError,
};
pub use self::read_model_builder::ReadModelBuilder;
pub use self::registry_service::RegistryService;
pub use self::stores::{TrainingStores, retry_stale};
pub use self::trace_id::TraceId;
pub use self::training_error::TrainingError;

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use training_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
