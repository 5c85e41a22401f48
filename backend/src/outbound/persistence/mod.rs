//! PostgreSQL document stores.
//!
//! Purpose: persist the three training aggregates as JSONB documents with
//! compare-and-set writes on a `revision` column. Each collection has its own
//! pool so courses, participants and companies may live in different
//! databases; there are no foreign keys between them.
//!
//! Public surface:
//! - `DbPool`, `PoolConfig`, `PoolError`: per-collection connection pools.
//! - `DieselCourseRepository`, `DieselParticipantRepository`,
//!   `DieselCompanyRepository`: driven-port adapters.
//! - `run_pending_migrations`: applies the embedded schema.

mod diesel_company_repository;
mod diesel_course_repository;
mod diesel_participant_repository;
mod document;
mod migrations;
mod models;
mod pool;
mod schema;
mod store_error_mapping;

pub use diesel_company_repository::DieselCompanyRepository;
pub use diesel_course_repository::DieselCourseRepository;
pub use diesel_participant_repository::DieselParticipantRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
