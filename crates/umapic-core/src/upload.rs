//! Upload URL issuance.
//!
//! Issues a batch of presigned `PUT` URLs under one record namespace:
//! `photos/{userId}/{recordId}/original/{index}.jpg`. Nothing is persisted and
//! the record table is never touched; the client uploads the bytes and later
//! lists the returned keys in a create or update call.
//!
//! Indices always run `1..=count`. Two concurrent batches for the same
//! `recordId` therefore produce the same keys and the later upload wins.
//! Callers adding photos to an existing record must pick up where the record's
//! current keys leave off themselves.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::defaults::{PHOTO_CONTENT_TYPE, PHOTO_KEY_PREFIX, UPLOAD_COUNT, UPLOAD_COUNT_MAX};
use crate::error::{Error, Result};
use crate::ids::{is_safe_segment, new_record_id};
use crate::models::parse_clamped;
use crate::timestamps::{now_millis, serde_millis};
use crate::traits::PhotoStorage;

/// One pre-authorized photo destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlot {
    pub index: u32,
    pub upload_url: String,
    pub key: String,
    #[serde(with = "serde_millis")]
    pub expires_at: DateTime<Utc>,
}

/// Response payload of `GET /s3-upload-url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBatch {
    pub record_id: String,
    pub upload_urls: Vec<UploadSlot>,
}

/// Validated issuance parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadParams {
    pub count: u32,
    pub record_id: Option<String>,
}

impl UploadParams {
    /// `count` defaults to 1 and is clamped to 5; zero, negative or
    /// non-numeric values are rejected. An empty `recordId` counts as absent.
    pub fn parse(count: Option<&str>, record_id: Option<String>) -> Result<Self> {
        let count = match count {
            None => UPLOAD_COUNT,
            Some(raw) => parse_clamped("count", raw, UPLOAD_COUNT_MAX)?,
        };

        let record_id = record_id.filter(|id| !id.is_empty());
        if let Some(id) = &record_id {
            if !is_safe_segment(id) {
                return Err(Error::validation("recordId is not a valid key segment"));
            }
        }

        Ok(Self { count, record_id })
    }
}

/// Object key of the `index`-th original photo of a record.
pub fn photo_key(user_id: &str, record_id: &str, index: u32) -> String {
    format!("{PHOTO_KEY_PREFIX}/{user_id}/{record_id}/original/{index}.jpg")
}

/// Whether `key` lies inside `user_id`'s photo namespace.
///
/// Stored photo keys are client supplied, so anything that acts on them in
/// the bucket must check ownership first.
pub fn is_owned_photo_key(user_id: &str, key: &str) -> bool {
    key.strip_prefix(PHOTO_KEY_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .and_then(|rest| rest.strip_prefix(user_id))
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|rest| !rest.is_empty() && !rest.split('/').any(|s| s == ".."))
}

/// Issue `params.count` upload slots for `user_id`.
///
/// Mints a fresh record id when the caller did not supply one. Every slot in
/// the batch shares one `expiresAt`.
pub async fn issue_upload_urls(
    storage: &dyn PhotoStorage,
    user_id: &str,
    params: UploadParams,
    expires_in: Duration,
) -> Result<UploadBatch> {
    if !is_safe_segment(user_id) {
        return Err(Error::validation("user id is not a valid key segment"));
    }

    let record_id = params.record_id.unwrap_or_else(new_record_id);
    let lifetime = chrono::Duration::from_std(expires_in)
        .map_err(|e| Error::Config(format!("upload URL lifetime out of range: {e}")))?;
    let expires_at = now_millis() + lifetime;

    let mut upload_urls = Vec::with_capacity(params.count as usize);
    for index in 1..=params.count {
        let key = photo_key(user_id, &record_id, index);
        let upload_url = storage
            .presign_upload(&key, PHOTO_CONTENT_TYPE, expires_in)
            .await?;
        upload_urls.push(UploadSlot {
            index,
            upload_url,
            key,
            expires_at,
        });
    }

    debug!(
        subsystem = "core",
        component = "upload_urls",
        op = "issue",
        record_id = %record_id,
        count = upload_urls.len(),
        "Issued upload URLs"
    );

    Ok(UploadBatch {
        record_id,
        upload_urls,
    })
}
