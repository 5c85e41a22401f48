//! Driven port for the course document store.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::{Course, CourseId};

/// Persistence port for [`Course`] documents.
///
/// `save` is a compare-and-set: with `expected_revision = None` it inserts a
/// new document, otherwise it only writes when the stored revision still
/// equals `expected_revision` and fails with
/// [`StoreError::RevisionMismatch`] when it does not.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Fetch a course by id.
    async fn find_by_id(&self, id: &CourseId) -> Result<Option<Course>, StoreError>;

    /// Every course, oldest first.
    async fn list(&self) -> Result<Vec<Course>, StoreError>;

    /// Insert or revision-checked update.
    async fn save(&self, course: &Course, expected_revision: Option<u32>) -> Result<(), StoreError>;

    /// Remove a course. Returns `false` when it did not exist.
    async fn delete(&self, id: &CourseId) -> Result<bool, StoreError>;
}
