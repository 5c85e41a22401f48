//! PostgreSQL-backed `CourseRepository` storing each course as a JSONB
//! document with compare-and-set writes on the `revision` column.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{CourseRepository, StoreError};
use crate::domain::{Course, CourseId};

use super::document::{cast_revision, cast_revision_for_db, decode, decode_all};
use super::models::{CourseRecord, CourseRow};
use super::pool::DbPool;
use super::schema::courses;
use super::store_error_mapping::{map_diesel_error, map_pool_error};

/// Diesel-backed implementation of the [`CourseRepository`] port.
#[derive(Clone)]
pub struct DieselCourseRepository {
    pool: DbPool,
}

impl DieselCourseRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Tell a revision mismatch from a missing row after an update hit nothing.
async fn handle_course_update_failure<C>(conn: &mut C, id: Uuid, expected: u32) -> StoreError
where
    C: diesel_async::AsyncConnection<Backend = diesel::pg::Pg> + Send,
{
    let current = courses::table
        .find(id)
        .select(courses::revision)
        .first::<i32>(conn)
        .await
        .optional()
        .map_err(map_diesel_error);

    match current {
        Ok(Some(actual)) => StoreError::revision_mismatch(expected, cast_revision(actual)),
        Ok(None) => StoreError::query(format!("course {id} not found for update")),
        Err(err) => err,
    }
}

#[async_trait]
impl CourseRepository for DieselCourseRepository {
    async fn find_by_id(&self, id: &CourseId) -> Result<Option<Course>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<CourseRow> = courses::table
            .find(id.as_uuid())
            .select(CourseRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(|row| decode("course", row.document)).transpose()
    }

    async fn list(&self) -> Result<Vec<Course>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<CourseRow> = courses::table
            .select(CourseRow::as_select())
            .order_by((courses::created_at.asc(), courses::id.asc()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        decode_all("course", rows.into_iter().map(|row| row.document))
    }

    async fn save(&self, course: &Course, expected_revision: Option<u32>) -> Result<(), StoreError> {
        let record = CourseRecord::try_from(course)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let Some(expected) = expected_revision else {
            return diesel::insert_into(courses::table)
                .values(&record)
                .execute(&mut conn)
                .await
                .map(|_| ())
                .map_err(map_diesel_error);
        };

        let updated_rows = diesel::update(courses::table)
            .filter(
                courses::id
                    .eq(record.id)
                    .and(courses::revision.eq(cast_revision_for_db(expected))),
            )
            .set(&record)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        if updated_rows == 0 {
            return Err(handle_course_update_failure(&mut conn, record.id, expected).await);
        }
        Ok(())
    }

    async fn delete(&self, id: &CourseId) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(courses::table.find(id.as_uuid()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}
