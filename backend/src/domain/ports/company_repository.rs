//! Driven port for the company document store.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::{Company, CompanyId, TaxId};

/// Persistence port for [`Company`] documents.
///
/// `save` follows the same compare-and-set contract as
/// [`CourseRepository::save`](super::CourseRepository::save). Adapters must
/// report a tax id collision as [`StoreError::Duplicate`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompanyRepository: Send + Sync {
    /// Fetch a company by id.
    async fn find_by_id(&self, id: &CompanyId) -> Result<Option<Company>, StoreError>;

    /// Fetch the company registered under `tax_id`.
    async fn find_by_tax_id(&self, tax_id: &TaxId) -> Result<Option<Company>, StoreError>;

    /// Every company, oldest first.
    async fn list(&self) -> Result<Vec<Company>, StoreError>;

    /// Insert or revision-checked update.
    async fn save(&self, company: &Company, expected_revision: Option<u32>) -> Result<(), StoreError>;

    /// Remove a company. Returns `false` when it did not exist.
    async fn delete(&self, id: &CompanyId) -> Result<bool, StoreError>;
}
