//! HTTP inbound adapter exposing the training REST endpoints.

use actix_web::web;

pub mod auth;
pub mod companies;
pub mod courses;
pub mod error;
pub mod health;
pub mod participants;
pub mod session;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

pub use error::ApiResult;

/// Register every `/api/v1` handler on `cfg`.
///
/// Literal segments (`/participants/history`, `/companies/summary`) are
/// registered before their `{id}` siblings so they match first.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(auth::login)
        .service(auth::logout)
        .service(auth::me)
        .service(courses::create_course)
        .service(courses::list_courses)
        .service(courses::get_course)
        .service(courses::update_course)
        .service(courses::delete_course)
        .service(courses::course_roster)
        .service(courses::enroll)
        .service(courses::withdraw)
        .service(participants::create_participant)
        .service(participants::list_participants)
        .service(participants::participant_history)
        .service(participants::get_participant)
        .service(participants::update_participant)
        .service(participants::delete_participant)
        .service(participants::deactivate_participant)
        .service(participants::set_enrollment_status)
        .service(participants::attach_certificate)
        .service(participants::revoke_certificate)
        .service(companies::register_company)
        .service(companies::list_companies)
        .service(companies::companies_summary)
        .service(companies::get_company)
        .service(companies::update_company)
        .service(companies::delete_company)
        .service(companies::affiliate)
        .service(companies::detach)
        .service(companies::company_statistics)
        .service(companies::course_statistics)
        .service(companies::participants_by_course)
        .service(companies::company_overview);
}
