//! PostgreSQL-backed `ParticipantRepository` storing each participant as a
//! JSONB document.
//!
//! `company_id` and `email` are projected out of the document on every
//! write: the first drives affiliate lookups, the second carries the unique
//! constraint. Enrollment lookups use JSONB containment on the document.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{Text, Timestamptz};
use diesel_async::RunQueryDsl;
use mockable::{Clock, DefaultClock};
use serde_json::json;
use uuid::Uuid;

use crate::domain::ports::{ParticipantRepository, StoreError};
use crate::domain::{CompanyId, CourseId, EmailAddress, Participant, ParticipantId};

use super::document::{cast_revision, cast_revision_for_db, decode, decode_all};
use super::models::{ParticipantRecord, ParticipantRow};
use super::pool::DbPool;
use super::schema::participants;
use super::store_error_mapping::{map_diesel_error, map_pool_error};

/// Rewrites the denormalised company name, bumping revision and write time
/// in both the document and the projected columns.
const RENAME_COMPANY_SQL: &str = r"
UPDATE participants
SET document = jsonb_set(
        jsonb_set(
            jsonb_set(document, '{company,companyName}', to_jsonb($2::text)),
            '{revision}', to_jsonb(revision + 1)
        ),
        '{updatedAt}', to_jsonb($3::timestamptz)
    ),
    revision = revision + 1,
    updated_at = $3
WHERE company_id = $1
  AND document #>> '{company,companyName}' IS DISTINCT FROM $2
";

/// Row selection for [`DieselParticipantRepository::load_where`].
enum ParticipantFilter {
    All,
    Email(String),
    Company(Uuid),
    EnrolledIn(serde_json::Value),
}

/// Diesel-backed implementation of the [`ParticipantRepository`] port.
#[derive(Clone)]
pub struct DieselParticipantRepository {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl DieselParticipantRepository {
    /// Create a repository stamping bulk renames with the system clock.
    pub fn new(pool: DbPool) -> Self {
        Self::with_clock(pool, Arc::new(DefaultClock))
    }

    /// Create a repository stamping bulk renames with `clock`.
    pub fn with_clock(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    async fn load_where(&self, filter: ParticipantFilter) -> Result<Vec<Participant>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let mut query = participants::table
            .select(ParticipantRow::as_select())
            .order_by((participants::created_at.asc(), participants::id.asc()))
            .into_boxed();
        query = match filter {
            ParticipantFilter::All => query,
            ParticipantFilter::Email(email) => query.filter(participants::email.eq(email)),
            ParticipantFilter::Company(company_id) => {
                query.filter(participants::company_id.eq(company_id))
            }
            ParticipantFilter::EnrolledIn(fragment) => {
                query.filter(participants::document.contains(fragment))
            }
        };
        let rows: Vec<ParticipantRow> = query.load(&mut conn).await.map_err(map_diesel_error)?;

        decode_all("participant", rows.into_iter().map(|row| row.document))
    }
}

/// JSONB fragment matched by participants holding an enrollment in `course_id`.
fn enrollment_fragment(course_id: &CourseId) -> serde_json::Value {
    json!({ "enrollments": [{ "courseId": course_id }] })
}

/// Tell a revision mismatch from a missing row after an update hit nothing.
async fn handle_participant_update_failure<C>(
    conn: &mut C,
    id: Uuid,
    expected: u32,
) -> StoreError
where
    C: diesel_async::AsyncConnection<Backend = diesel::pg::Pg> + Send,
{
    let current = participants::table
        .find(id)
        .select(participants::revision)
        .first::<i32>(conn)
        .await
        .optional()
        .map_err(map_diesel_error);

    match current {
        Ok(Some(actual)) => StoreError::revision_mismatch(expected, cast_revision(actual)),
        Ok(None) => StoreError::query(format!("participant {id} not found for update")),
        Err(err) => err,
    }
}

#[async_trait]
impl ParticipantRepository for DieselParticipantRepository {
    async fn find_by_id(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<ParticipantRow> = participants::table
            .find(id.as_uuid())
            .select(ParticipantRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(|row| decode("participant", row.document)).transpose()
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Participant>, StoreError> {
        let found = self
            .load_where(ParticipantFilter::Email(email.as_ref().to_owned()))
            .await?;
        Ok(found.into_iter().next())
    }

    async fn list(&self) -> Result<Vec<Participant>, StoreError> {
        self.load_where(ParticipantFilter::All).await
    }

    async fn list_by_company(&self, company_id: &CompanyId) -> Result<Vec<Participant>, StoreError> {
        self.load_where(ParticipantFilter::Company(*company_id.as_uuid()))
            .await
    }

    async fn list_enrolled_in(&self, course_id: &CourseId) -> Result<Vec<Participant>, StoreError> {
        self.load_where(ParticipantFilter::EnrolledIn(enrollment_fragment(course_id)))
            .await
    }

    async fn save(
        &self,
        participant: &Participant,
        expected_revision: Option<u32>,
    ) -> Result<(), StoreError> {
        let record = ParticipantRecord::try_from(participant)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let Some(expected) = expected_revision else {
            return diesel::insert_into(participants::table)
                .values(&record)
                .execute(&mut conn)
                .await
                .map(|_| ())
                .map_err(map_diesel_error);
        };

        let updated_rows = diesel::update(participants::table)
            .filter(
                participants::id
                    .eq(record.id)
                    .and(participants::revision.eq(cast_revision_for_db(expected))),
            )
            .set(&record)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        if updated_rows == 0 {
            return Err(handle_participant_update_failure(&mut conn, record.id, expected).await);
        }
        Ok(())
    }

    async fn rename_company(&self, company_id: &CompanyId, name: &str) -> Result<usize, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::sql_query(RENAME_COMPANY_SQL)
            .bind::<diesel::sql_types::Uuid, _>(*company_id.as_uuid())
            .bind::<Text, _>(name)
            .bind::<Timestamptz, _>(self.clock.utc())
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)
    }

    async fn delete(&self, id: &ParticipantId) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(participants::table.find(id.as_uuid()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}
