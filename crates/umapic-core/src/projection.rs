//! Public read shapes of a record.
//!
//! The list shape carries a single `thumbnailUrl` built from the first photo
//! key as-is. The detail shape maps every photo key to an original URL and a
//! thumbnail URL, where the thumbnail path is a first-occurrence textual
//! replacement of `/original/` with `/thumbnail/`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::{ORIGINAL_SEGMENT, THUMBNAIL_SEGMENT};
use crate::models::RecordItem;
use crate::timestamps::serde_millis;

/// Builds public URLs for photo object keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUrls {
    base_url: String,
}

impl PhotoUrls {
    /// `base_url` is prepended verbatim, so it should end with `/`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Public URL layout of an S3 bucket.
    pub fn for_bucket(bucket: &str) -> Self {
        Self::new(format!("https://{bucket}.s3.amazonaws.com/"))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn original_url(&self, key: &str) -> String {
        format!("{}{}", self.base_url, key)
    }

    pub fn thumbnail_url(&self, key: &str) -> String {
        format!("{}{}", self.base_url, thumbnail_key(key))
    }
}

/// Key of the thumbnail variant. Keys without `/original/` map to themselves.
pub fn thumbnail_key(key: &str) -> String {
    key.replacen(ORIGINAL_SEGMENT, THUMBNAIL_SEGMENT, 1)
}

/// List projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub record_id: String,
    pub store_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub visit_date: String,
    pub rating: f64,
    pub note: Option<String>,
    pub companions: Vec<String>,
    pub thumbnail_url: Option<String>,
    #[serde(with = "serde_millis")]
    pub created_at: DateTime<Utc>,
}

/// One photo of the detail projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    /// Storage key, echoed so clients can reorder or drop photos on update.
    pub key: String,
    pub original_url: String,
    pub thumbnail_url: String,
}

/// Detail projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDetail {
    pub record_id: String,
    pub store_name: String,
    pub place_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub visit_date: String,
    pub rating: f64,
    pub note: Option<String>,
    pub companions: Vec<String>,
    pub photos: Vec<Photo>,
    #[serde(with = "serde_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "serde_millis")]
    pub updated_at: DateTime<Utc>,
}

/// Payload of `GET /records`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordList {
    pub records: Vec<RecordSummary>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Payload of `POST /records`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCreated {
    pub record_id: String,
    #[serde(with = "serde_millis")]
    pub created_at: DateTime<Utc>,
}

/// Payload of `PUT/PATCH /records/{recordId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUpdated {
    pub record_id: String,
    #[serde(with = "serde_millis")]
    pub updated_at: DateTime<Utc>,
}

impl RecordSummary {
    pub fn project(item: RecordItem, urls: &PhotoUrls) -> Self {
        let thumbnail_url = item.photo_keys.first().map(|key| urls.original_url(key));
        Self {
            record_id: item.record_id,
            store_name: item.store_name,
            latitude: item.latitude,
            longitude: item.longitude,
            visit_date: item.visit_date,
            rating: item.rating,
            note: item.note,
            companions: item.companions,
            thumbnail_url,
            created_at: item.created_at,
        }
    }
}

impl RecordDetail {
    pub fn project(item: RecordItem, urls: &PhotoUrls) -> Self {
        let photos = item
            .photo_keys
            .into_iter()
            .map(|key| Photo {
                original_url: urls.original_url(&key),
                thumbnail_url: urls.thumbnail_url(&key),
                key,
            })
            .collect();
        Self {
            record_id: item.record_id,
            store_name: item.store_name,
            place_id: item.place_id,
            latitude: item.latitude,
            longitude: item.longitude,
            address: item.address,
            visit_date: item.visit_date,
            rating: item.rating,
            note: item.note,
            companions: item.companions,
            photos,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}
