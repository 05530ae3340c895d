//! Storage seams.
//!
//! The record table and the object store are external collaborators; these
//! traits let the HTTP layer run against PostgreSQL and S3 in production and
//! in-memory fakes in tests.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{RecordItem, RecordPage, RecordPatch, RecordQuery};

/// Record table partitioned by user, ordered by visit date within a user.
///
/// Every method takes the owning `user_id`; an item is only ever addressed
/// by the pair, so one user's id can never reach another user's record.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// One page of the user's records in visit-date order.
    async fn list(&self, user_id: &str, query: RecordQuery) -> Result<RecordPage>;

    /// Persist a new item.
    async fn insert(&self, item: &RecordItem) -> Result<()>;

    /// Fetch the item for (user, record), if any.
    async fn fetch(&self, user_id: &str, record_id: &str) -> Result<Option<RecordItem>>;

    /// Apply `patch` to an existing item and refresh `updatedAt`.
    ///
    /// Conditioned on existence in a single write; fails with
    /// `Error::RecordNotFound` instead of creating. Returns the new
    /// `updatedAt`, which is strictly later than the previous one.
    async fn update(
        &self,
        user_id: &str,
        record_id: &str,
        patch: &RecordPatch,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>>;

    /// Remove the item if present and return what was removed.
    async fn delete(&self, user_id: &str, record_id: &str) -> Result<Option<RecordItem>>;
}

/// Object storage holding record photos.
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Presigned single-object `PUT` URL for `key`.
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<String>;

    /// Delete the object at `key`. Deleting a missing object is not an error.
    async fn delete_object(&self, key: &str) -> Result<()>;
}
