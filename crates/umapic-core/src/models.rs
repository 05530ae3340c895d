//! Record domain types and request payloads.
//!
//! `RecordItem` is the stored shape. Public read shapes live in
//! [`crate::projection`].

use std::num::IntErrorKind;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use crate::cursor::ResumePosition;
use crate::defaults::{LIST_LIMIT, LIST_LIMIT_MAX, SORT_VISIT_DATE};
use crate::error::{Error, Result};
use crate::timestamps::serde_millis;

// =============================================================================
// ORDERING
// =============================================================================

/// Direction of the visit-date range scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// `asc` selects ascending; anything else (including absence) is descending.
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

// =============================================================================
// STORED ITEM
// =============================================================================

/// One visit entry as held by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordItem {
    pub user_id: String,
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
    pub photo_keys: Vec<String>,
    #[serde(with = "serde_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "serde_millis")]
    pub updated_at: DateTime<Utc>,
}

impl RecordItem {
    /// Position of this item in the visit-date index.
    pub fn position(&self) -> ResumePosition {
        ResumePosition {
            visit_date: self.visit_date.clone(),
            record_id: self.record_id.clone(),
        }
    }

    /// Case-insensitive substring match against store name, note and companions.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let kw = keyword.to_lowercase();
        self.store_name.to_lowercase().contains(&kw)
            || self
                .note
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&kw))
            || self
                .companions
                .iter()
                .any(|c| c.to_lowercase().contains(&kw))
    }
}

// =============================================================================
// CREATE
// =============================================================================

/// Body of `POST /records`.
///
/// Required fields are optional here so that a missing field surfaces as a
/// `VALIDATION_ERROR` listing every gap instead of a deserializer message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub companions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_keys: Option<Vec<String>>,
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub store_name: String,
    pub place_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub visit_date: String,
    pub rating: f64,
    pub note: Option<String>,
    pub companions: Vec<String>,
    pub photo_keys: Vec<String>,
}

impl CreateRecordRequest {
    /// Check required fields. Nothing is written when this fails.
    pub fn validate(self) -> Result<NewRecord> {
        let mut missing = Vec::new();
        if self.store_name.as_deref().map_or(true, str::is_empty) {
            missing.push("storeName");
        }
        if self.latitude.is_none() {
            missing.push("latitude");
        }
        if self.longitude.is_none() {
            missing.push("longitude");
        }
        if self.visit_date.as_deref().map_or(true, str::is_empty) {
            missing.push("visitDate");
        }
        if self.rating.is_none() {
            missing.push("rating");
        }

        match (
            self.store_name,
            self.latitude,
            self.longitude,
            self.visit_date,
            self.rating,
        ) {
            (Some(store_name), Some(latitude), Some(longitude), Some(visit_date), Some(rating))
                if missing.is_empty() =>
            {
                Ok(NewRecord {
                    store_name,
                    place_id: self.place_id,
                    latitude,
                    longitude,
                    address: self.address,
                    visit_date,
                    rating,
                    note: self.note,
                    companions: self.companions.unwrap_or_default(),
                    photo_keys: self.photo_keys.unwrap_or_default(),
                })
            }
            _ => Err(Error::Validation {
                message: format!("Missing required fields: {}", missing.join(", ")),
                details: Some(json!({ "missingFields": missing })),
            }),
        }
    }
}

impl NewRecord {
    /// Materialize the stored item. `createdAt` and `updatedAt` both get `now`.
    pub fn into_item(self, user_id: &str, record_id: String, now: DateTime<Utc>) -> RecordItem {
        RecordItem {
            user_id: user_id.to_string(),
            record_id,
            store_name: self.store_name,
            place_id: self.place_id,
            latitude: self.latitude,
            longitude: self.longitude,
            address: self.address,
            visit_date: self.visit_date,
            rating: self.rating,
            note: self.note,
            companions: self.companions,
            photo_keys: self.photo_keys,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// UPDATE
// =============================================================================

/// Deserialize a present field as `Some(..)`, keeping an explicit `null` as
/// `Some(None)`. Combined with `#[serde(default)]` an absent field is `None`.
fn present<'de, T, D>(d: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

/// Body of `PUT/PATCH /records/{recordId}`.
///
/// Outer `None`: field absent, leave untouched. `Some(None)`: explicit `null`.
/// `Some(Some(v))`: overwrite with `v`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordRequest {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub store_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub visit_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub rating: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub note: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub companions: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub photo_keys: Option<Option<Vec<String>>>,
}

/// A validated partial update. `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub store_name: Option<String>,
    pub visit_date: Option<String>,
    pub rating: Option<f64>,
    /// `Some(None)` clears the note.
    pub note: Option<Option<String>>,
    pub companions: Option<Vec<String>>,
    pub photo_keys: Option<Vec<String>>,
}

impl UpdateRecordRequest {
    /// Resolve presence into a patch.
    ///
    /// Required fields cannot be cleared. A `null` list clears to empty.
    pub fn validate(self) -> Result<RecordPatch> {
        let store_name = match self.store_name {
            None => None,
            Some(Some(name)) if !name.is_empty() => Some(name),
            Some(_) => return Err(Error::validation("storeName cannot be empty")),
        };
        let visit_date = match self.visit_date {
            None => None,
            Some(Some(date)) if !date.is_empty() => Some(date),
            Some(_) => return Err(Error::validation("visitDate cannot be empty")),
        };
        let rating = match self.rating {
            None => None,
            Some(Some(rating)) => Some(rating),
            Some(None) => return Err(Error::validation("rating cannot be null")),
        };

        Ok(RecordPatch {
            store_name,
            visit_date,
            rating,
            note: self.note,
            companions: self.companions.map(Option::unwrap_or_default),
            photo_keys: self.photo_keys.map(Option::unwrap_or_default),
        })
    }
}

impl RecordPatch {
    /// Overwrite the fields present in the patch. Timestamps are left alone.
    pub fn apply_to(&self, item: &mut RecordItem) {
        if let Some(store_name) = &self.store_name {
            item.store_name = store_name.clone();
        }
        if let Some(visit_date) = &self.visit_date {
            item.visit_date = visit_date.clone();
        }
        if let Some(rating) = self.rating {
            item.rating = rating;
        }
        if let Some(note) = &self.note {
            item.note = note.clone();
        }
        if let Some(companions) = &self.companions {
            item.companions = companions.clone();
        }
        if let Some(photo_keys) = &self.photo_keys {
            item.photo_keys = photo_keys.clone();
        }
    }
}

// =============================================================================
// LIST
// =============================================================================

/// Validated listing parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub order: SortOrder,
    pub limit: u32,
    pub cursor: Option<String>,
    pub keyword: Option<String>,
}

impl ListParams {
    /// Parse raw query values.
    ///
    /// `limit` defaults to 20 and is clamped to 100; zero, negative or
    /// non-numeric values are rejected. Only `visitDate` is accepted as `sort`.
    pub fn parse(
        sort: Option<&str>,
        order: Option<&str>,
        limit: Option<&str>,
        cursor: Option<String>,
        keyword: Option<String>,
    ) -> Result<Self> {
        if let Some(sort) = sort {
            if sort != SORT_VISIT_DATE {
                return Err(Error::validation(format!(
                    "sort must be {SORT_VISIT_DATE}, got {sort}"
                )));
            }
        }

        let limit = match limit {
            None => LIST_LIMIT,
            Some(raw) => parse_clamped("limit", raw, LIST_LIMIT_MAX)?,
        };

        Ok(Self {
            order: SortOrder::from_param(order),
            limit,
            cursor: cursor.filter(|c| !c.is_empty()),
            keyword: keyword.filter(|k| !k.is_empty()),
        })
    }
}

/// Parse a positive integer query value, clamping it to `max`.
///
/// Values too large for any integer type clamp as well; only zero, negative
/// and non-numeric input is rejected.
pub(crate) fn parse_clamped(name: &str, raw: &str, max: u32) -> Result<u32> {
    match raw.trim().parse::<i64>() {
        Ok(value) if value < 1 => Err(Error::validation(format!("{name} must be >= 1"))),
        Ok(value) => Ok(value.min(i64::from(max)) as u32),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Ok(max),
            IntErrorKind::NegOverflow => Err(Error::validation(format!("{name} must be >= 1"))),
            _ => Err(Error::validation(format!("{name} must be an integer, got {raw}"))),
        },
    }
}

/// Range scan handed to a [`crate::traits::RecordRepository`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub order: SortOrder,
    pub limit: u32,
    /// Exclusive start position from a previous page.
    pub after: Option<ResumePosition>,
}

/// One page of a range scan.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPage {
    pub items: Vec<RecordItem>,
    /// Position of the last item, present only when more items follow.
    pub next: Option<ResumePosition>,
}
