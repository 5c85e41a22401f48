//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`*Repository`) describe the three document stores. Driving
//! ports (`*Command`, `*Query`, `TrainingReadModel`, `LoginService`) are
//! what inbound adapters call.

mod macros;
pub(crate) use macros::define_port_error;

mod affiliation_command;
mod company_repository;
mod course_repository;
mod enrollment_command;
mod lifecycle_command;
mod login_service;
mod participant_repository;
mod registry_command;
mod store_error;
mod training_read_model;

#[cfg(test)]
pub use affiliation_command::MockAffiliationCommand;
pub use affiliation_command::{AffiliationCommand, AffiliationOutcome, RenameOutcome};
#[cfg(test)]
pub use company_repository::MockCompanyRepository;
pub use company_repository::CompanyRepository;
#[cfg(test)]
pub use course_repository::MockCourseRepository;
pub use course_repository::CourseRepository;
#[cfg(test)]
pub use enrollment_command::MockEnrollmentCommand;
pub use enrollment_command::{
    EnrollmentCommand, EnrollmentOutcome, EnrollmentRequest, EnrollmentStatusUpdate,
    WithdrawalOutcome,
};
#[cfg(test)]
pub use lifecycle_command::MockLifecycleCommand;
pub use lifecycle_command::{DeactivationReport, LifecycleCommand};
pub use login_service::{FIXTURE_ADMIN_ID, FixtureLoginService, LoginService};
#[cfg(test)]
pub use participant_repository::MockParticipantRepository;
pub use participant_repository::ParticipantRepository;
#[cfg(test)]
pub use registry_command::{MockRegistryCommand, MockRegistryQuery};
pub use registry_command::{
    CertificateUpload, CompanyUpdate, CompanyUpdated, NewCompany, NewParticipant, RegistryCommand,
    RegistryQuery,
};
pub use store_error::StoreError;
#[cfg(test)]
pub use training_read_model::MockTrainingReadModel;
pub use training_read_model::{
    AffiliateView, CompanyOverview, CompanyStatistics, CompanySummary, CourseGroup,
    CourseParticipant, CourseRoster, CourseStatistics, CourseStatisticsLine, CourseSummary,
    EnrollmentView, OverviewStatistics, ParticipantsByCourse, RosterLine, TrainingReadModel,
};
