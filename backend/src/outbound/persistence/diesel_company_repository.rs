//! PostgreSQL-backed `CompanyRepository` storing each company as a JSONB
//! document. The tax id is projected into its own column and carries the
//! unique constraint.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{CompanyRepository, StoreError};
use crate::domain::{Company, CompanyId, TaxId};

use super::document::{cast_revision, cast_revision_for_db, decode, decode_all};
use super::models::{CompanyRecord, CompanyRow};
use super::pool::DbPool;
use super::schema::companies;
use super::store_error_mapping::{map_diesel_error, map_pool_error};

/// Diesel-backed implementation of the [`CompanyRepository`] port.
#[derive(Clone)]
pub struct DieselCompanyRepository {
    pool: DbPool,
}

impl DieselCompanyRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

async fn handle_company_update_failure<C>(conn: &mut C, id: Uuid, expected: u32) -> StoreError
where
    C: diesel_async::AsyncConnection<Backend = diesel::pg::Pg> + Send,
{
    let current = companies::table
        .find(id)
        .select(companies::revision)
        .first::<i32>(conn)
        .await
        .optional()
        .map_err(map_diesel_error);

    match current {
        Ok(Some(actual)) => StoreError::revision_mismatch(expected, cast_revision(actual)),
        Ok(None) => StoreError::query(format!("company {id} not found for update")),
        Err(err) => err,
    }
}

#[async_trait]
impl CompanyRepository for DieselCompanyRepository {
    async fn find_by_id(&self, id: &CompanyId) -> Result<Option<Company>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<CompanyRow> = companies::table
            .find(id.as_uuid())
            .select(CompanyRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(|row| decode("company", row.document)).transpose()
    }

    async fn find_by_tax_id(&self, tax_id: &TaxId) -> Result<Option<Company>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<CompanyRow> = companies::table
            .filter(companies::tax_id.eq(tax_id.as_ref()))
            .select(CompanyRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(|row| decode("company", row.document)).transpose()
    }

    async fn list(&self) -> Result<Vec<Company>, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<CompanyRow> = companies::table
            .select(CompanyRow::as_select())
            .order_by((companies::created_at.asc(), companies::id.asc()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        decode_all("company", rows.into_iter().map(|row| row.document))
    }

    async fn save(&self, company: &Company, expected_revision: Option<u32>) -> Result<(), StoreError> {
        let record = CompanyRecord::try_from(company)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let Some(expected) = expected_revision else {
            return diesel::insert_into(companies::table)
                .values(&record)
                .execute(&mut conn)
                .await
                .map(|_| ())
                .map_err(map_diesel_error);
        };

        let updated_rows = diesel::update(companies::table)
            .filter(
                companies::id
                    .eq(record.id)
                    .and(companies::revision.eq(cast_revision_for_db(expected))),
            )
            .set(&record)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        if updated_rows == 0 {
            return Err(handle_company_update_failure(&mut conn, record.id, expected).await);
        }
        Ok(())
    }

    async fn delete(&self, id: &CompanyId) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(companies::table.find(id.as_uuid()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}
