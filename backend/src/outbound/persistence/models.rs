//! Internal Diesel row structs for the document tables.
//!
//! These types never leave the persistence layer. Conversion to and from the
//! domain aggregates lives in [`super::document`].

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{companies, courses, participants};

/// Stored document as read back from any of the tables.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CourseRow {
    pub document: serde_json::Value,
}

/// Insertable and changeset form of a course document.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = courses)]
pub(crate) struct CourseRecord {
    pub id: Uuid,
    pub document: serde_json::Value,
    pub revision: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = participants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ParticipantRow {
    pub document: serde_json::Value,
}

/// Insertable and changeset form of a participant document.
///
/// `company_id` is written as `NULL` when the link is cleared, so the
/// changeset must not skip `None`.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = participants)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ParticipantRecord {
    pub id: Uuid,
    pub company_id: Option<Uuid>,
    pub email: String,
    pub document: serde_json::Value,
    pub revision: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = companies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CompanyRow {
    pub document: serde_json::Value,
}

/// Insertable and changeset form of a company document.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = companies)]
pub(crate) struct CompanyRecord {
    pub id: Uuid,
    pub tax_id: String,
    pub document: serde_json::Value,
    pub revision: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
