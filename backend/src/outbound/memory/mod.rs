//! In-memory document stores.
//!
//! Used when no database URL is configured and as the fake stores behind
//! service and HTTP tests. Each store keeps whole documents keyed by id and
//! honours the same compare-and-set contract as the PostgreSQL adapters.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::ports::{
    CompanyRepository, CourseRepository, ParticipantRepository, StoreError,
};
use crate::domain::{
    Company, CompanyId, Course, CourseId, EmailAddress, Participant, ParticipantId, TaxId,
};

/// Key, revision and ordering of a stored document.
trait Document: Clone + Send + Sync {
    fn key(&self) -> Uuid;
    fn stored_revision(&self) -> u32;
    fn stored_at(&self) -> DateTime<Utc>;
    /// Value that must be unique across the table, if any.
    fn unique_value(&self) -> Option<String> {
        None
    }
}

impl Document for Course {
    fn key(&self) -> Uuid {
        *self.id().as_uuid()
    }

    fn stored_revision(&self) -> u32 {
        self.revision()
    }

    fn stored_at(&self) -> DateTime<Utc> {
        self.created_at()
    }
}

impl Document for Participant {
    fn key(&self) -> Uuid {
        *self.id().as_uuid()
    }

    fn stored_revision(&self) -> u32 {
        self.revision()
    }

    fn stored_at(&self) -> DateTime<Utc> {
        self.created_at()
    }

    fn unique_value(&self) -> Option<String> {
        Some(self.profile().email.as_ref().to_owned())
    }
}

impl Document for Company {
    fn key(&self) -> Uuid {
        *self.id().as_uuid()
    }

    fn stored_revision(&self) -> u32 {
        self.revision()
    }

    fn stored_at(&self) -> DateTime<Utc> {
        self.created_at()
    }

    fn unique_value(&self) -> Option<String> {
        Some(self.tax_id().as_ref().to_owned())
    }
}

/// Shared compare-and-set table.
struct Table<T> {
    label: &'static str,
    rows: RwLock<HashMap<Uuid, T>>,
}

impl<T: Document> Table<T> {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            rows: RwLock::new(HashMap::new()),
        }
    }

    async fn get(&self, key: Uuid) -> Option<T> {
        self.rows.read().await.get(&key).cloned()
    }

    async fn select(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        let rows = self.rows.read().await;
        let mut found: Vec<T> = rows.values().filter(|row| predicate(row)).cloned().collect();
        found.sort_by_key(|row| (row.stored_at(), row.key()));
        found
    }

    async fn save(&self, document: &T, expected_revision: Option<u32>) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        let key = document.key();
        if let Some(unique) = document.unique_value() {
            let clash = rows
                .values()
                .any(|row| row.key() != key && row.unique_value().as_deref() == Some(&unique));
            if clash {
                return Err(StoreError::duplicate(format!("{} {unique}", self.label)));
            }
        }
        match (rows.get(&key), expected_revision) {
            (Some(_), None) => {
                return Err(StoreError::duplicate(format!("{} {key} already exists", self.label)));
            }
            (None, Some(_)) => {
                return Err(StoreError::query(format!("{} {key} does not exist", self.label)));
            }
            (Some(stored), Some(expected)) if stored.stored_revision() != expected => {
                return Err(StoreError::revision_mismatch(expected, stored.stored_revision()));
            }
            _ => {}
        }
        rows.insert(key, document.clone());
        Ok(())
    }

    async fn delete(&self, key: Uuid) -> bool {
        self.rows.write().await.remove(&key).is_some()
    }
}

/// In-memory [`CourseRepository`].
pub struct InMemoryCourseRepository {
    table: Table<Course>,
}

impl Default for InMemoryCourseRepository {
    fn default() -> Self {
        Self {
            table: Table::new("course"),
        }
    }
}

impl InMemoryCourseRepository {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseRepository for InMemoryCourseRepository {
    async fn find_by_id(&self, id: &CourseId) -> Result<Option<Course>, StoreError> {
        Ok(self.table.get(*id.as_uuid()).await)
    }

    async fn list(&self) -> Result<Vec<Course>, StoreError> {
        Ok(self.table.select(|_| true).await)
    }

    async fn save(&self, course: &Course, expected_revision: Option<u32>) -> Result<(), StoreError> {
        self.table.save(course, expected_revision).await
    }

    async fn delete(&self, id: &CourseId) -> Result<bool, StoreError> {
        Ok(self.table.delete(*id.as_uuid()).await)
    }
}

/// In-memory [`ParticipantRepository`].
pub struct InMemoryParticipantRepository {
    table: Table<Participant>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryParticipantRepository {
    fn default() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }
}

impl InMemoryParticipantRepository {
    /// Empty store stamping bulk renames with the system clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store stamping bulk renames with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            table: Table::new("participant"),
            clock,
        }
    }
}

#[async_trait]
impl ParticipantRepository for InMemoryParticipantRepository {
    async fn find_by_id(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError> {
        Ok(self.table.get(*id.as_uuid()).await)
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Participant>, StoreError> {
        Ok(self
            .table
            .select(|participant| participant.profile().email == *email)
            .await
            .into_iter()
            .next())
    }

    async fn list(&self) -> Result<Vec<Participant>, StoreError> {
        Ok(self.table.select(|_| true).await)
    }

    async fn list_by_company(&self, company_id: &CompanyId) -> Result<Vec<Participant>, StoreError> {
        Ok(self
            .table
            .select(|participant| {
                participant
                    .company()
                    .is_some_and(|link| link.company_id == *company_id)
            })
            .await)
    }

    async fn list_enrolled_in(&self, course_id: &CourseId) -> Result<Vec<Participant>, StoreError> {
        Ok(self
            .table
            .select(|participant| participant.enrollment(course_id).is_some())
            .await)
    }

    async fn save(
        &self,
        participant: &Participant,
        expected_revision: Option<u32>,
    ) -> Result<(), StoreError> {
        self.table.save(participant, expected_revision).await
    }

    async fn rename_company(&self, company_id: &CompanyId, name: &str) -> Result<usize, StoreError> {
        let now = self.clock.utc();
        let mut rows = self.table.rows.write().await;
        let mut changed = 0;
        for participant in rows.values_mut() {
            if participant.rename_company(company_id, name) {
                participant.advance(now);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete(&self, id: &ParticipantId) -> Result<bool, StoreError> {
        Ok(self.table.delete(*id.as_uuid()).await)
    }
}

/// In-memory [`CompanyRepository`].
pub struct InMemoryCompanyRepository {
    table: Table<Company>,
}

impl Default for InMemoryCompanyRepository {
    fn default() -> Self {
        Self {
            table: Table::new("company tax id"),
        }
    }
}

impl InMemoryCompanyRepository {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CompanyRepository for InMemoryCompanyRepository {
    async fn find_by_id(&self, id: &CompanyId) -> Result<Option<Company>, StoreError> {
        Ok(self.table.get(*id.as_uuid()).await)
    }

    async fn find_by_tax_id(&self, tax_id: &TaxId) -> Result<Option<Company>, StoreError> {
        Ok(self
            .table
            .select(|company| company.tax_id() == tax_id)
            .await
            .into_iter()
            .next())
    }

    async fn list(&self) -> Result<Vec<Company>, StoreError> {
        Ok(self.table.select(|_| true).await)
    }

    async fn save(
        &self,
        company: &Company,
        expected_revision: Option<u32>,
    ) -> Result<(), StoreError> {
        self.table.save(company, expected_revision).await
    }

    async fn delete(&self, id: &CompanyId) -> Result<bool, StoreError> {
        Ok(self.table.delete(*id.as_uuid()).await)
    }
}

#[cfg(test)]
mod tests;
