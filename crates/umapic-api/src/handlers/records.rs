//! Record HTTP handlers.
//!
//! Every route is scoped to the caller from `X-User-ID`; a record id is only
//! ever looked up together with that user id.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use futures::future::join_all;
use serde::Deserialize;
use tracing::{debug, info, warn, Span};

use umapic_core::{
    is_owned_photo_key, logging, new_record_id, now_millis, thumbnail_key, CreateRecordRequest,
    ListParams, RecordCreated, RecordDetail, RecordItem, RecordList, RecordQuery, RecordSummary,
    RecordUpdated, UpdateRecordRequest,
};

use crate::envelope::{data, Data};
use crate::error::ApiError;
use crate::extract::UserId;
use crate::AppState;

/// Query parameters for listing records.
///
/// Kept as raw strings so malformed numbers surface as `VALIDATION_ERROR`
/// with a specific message.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRecordsQuery {
    pub sort: Option<String>,
    pub order: Option<String>,
    pub limit: Option<String>,
    pub cursor: Option<String>,
    pub keyword: Option<String>,
}

/// List the caller's records in visit-date order.
///
/// # Query Parameters
/// - `sort`: only `visitDate` is accepted
/// - `order`: `asc` or `desc` (default)
/// - `limit`: page size, default 20, clamped to 100
/// - `cursor`: `nextCursor` from the previous page
/// - `keyword`: case-insensitive filter over store name, note and companions
///
/// The keyword filter runs on the fetched page, so a page may hold fewer
/// than `limit` records while `hasMore` is still true.
///
/// # Returns
/// - 200 OK with `{records, nextCursor, hasMore}`
/// - 400 Bad Request for invalid parameters or cursor
pub async fn list_records(
    State(state): State<AppState>,
    user: UserId,
    query: Result<Query<ListRecordsQuery>, QueryRejection>,
) -> Result<Json<Data<RecordList>>, ApiError> {
    let Query(query) = query?;
    let params = ListParams::parse(
        query.sort.as_deref(),
        query.order.as_deref(),
        query.limit.as_deref(),
        query.cursor,
        query.keyword,
    )?;

    let after = params
        .cursor
        .as_deref()
        .map(|token| state.cursor.decode(token, params.order))
        .transpose()
        .map_err(umapic_core::Error::from)?;

    let page = state
        .records
        .list(
            user.as_str(),
            RecordQuery {
                order: params.order,
                limit: params.limit,
                after,
            },
        )
        .await?;

    let next_cursor = page
        .next
        .as_ref()
        .map(|pos| state.cursor.encode(params.order, pos))
        .transpose()
        .map_err(|e| umapic_core::Error::Internal(format!("cursor encoding failed: {e}")))?;

    let fetched = page.items.len();
    let records: Vec<RecordSummary> = page
        .items
        .into_iter()
        .filter(|item| {
            params
                .keyword
                .as_deref()
                .map_or(true, |kw| item.matches_keyword(kw))
        })
        .map(|item| RecordSummary::project(item, &state.urls))
        .collect();

    debug!(
        subsystem = "api",
        component = "records",
        op = "list",
        order = params.order.as_str(),
        limit = params.limit,
        fetched,
        result_count = records.len(),
        "Listed records"
    );

    Ok(data(RecordList {
        has_more: next_cursor.is_some(),
        next_cursor,
        records,
    }))
}

/// Create a record.
///
/// # Returns
/// - 201 Created with `{recordId, createdAt}`
/// - 400 Bad Request listing `missingFields` when a required field is absent
pub async fn create_record(
    State(state): State<AppState>,
    user: UserId,
    payload: Result<Json<CreateRecordRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Data<RecordCreated>>), ApiError> {
    let Json(body) = payload?;
    let new_record = body.validate()?;

    let record_id = new_record_id();
    Span::current().record(logging::RECORD_ID, record_id.as_str());

    let item = new_record.into_item(user.as_str(), record_id, now_millis());
    state.records.insert(&item).await?;

    info!(
        subsystem = "api",
        component = "records",
        op = "create",
        photo_count = item.photo_keys.len(),
        "Created record"
    );

    Ok((
        StatusCode::CREATED,
        data(RecordCreated {
            record_id: item.record_id,
            created_at: item.created_at,
        }),
    ))
}

/// Get one record in detail.
///
/// # Returns
/// - 200 OK with the detail projection
/// - 404 Not Found if the caller has no record with this id
pub async fn get_record(
    State(state): State<AppState>,
    user: UserId,
    Path(record_id): Path<String>,
) -> Result<Json<Data<RecordDetail>>, ApiError> {
    Span::current().record(logging::RECORD_ID, record_id.as_str());

    let item = state
        .records
        .fetch(user.as_str(), &record_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Record not found".to_string()))?;

    Ok(data(RecordDetail::project(item, &state.urls)))
}

/// Partially update a record. Serves both `PUT` and `PATCH`.
///
/// Fields absent from the body are left untouched; `"note": null` clears the
/// note and a `null` list clears to empty.
///
/// # Returns
/// - 200 OK with `{recordId, updatedAt}`
/// - 400 Bad Request for a malformed body or an attempt to clear a required field
/// - 404 Not Found if the record does not exist (nothing is created)
pub async fn update_record(
    State(state): State<AppState>,
    user: UserId,
    Path(record_id): Path<String>,
    payload: Result<Json<UpdateRecordRequest>, JsonRejection>,
) -> Result<Json<Data<RecordUpdated>>, ApiError> {
    Span::current().record(logging::RECORD_ID, record_id.as_str());

    let Json(body) = payload?;
    let patch = body.validate()?;

    let updated_at = state
        .records
        .update(user.as_str(), &record_id, &patch, now_millis())
        .await?;

    info!(
        subsystem = "api",
        component = "records",
        op = "update",
        "Updated record"
    );

    Ok(data(RecordUpdated {
        record_id,
        updated_at,
    }))
}

/// Delete a record and reclaim its photos.
///
/// Deleting a record that does not exist is not an error.
///
/// # Returns
/// - 204 No Content
pub async fn delete_record(
    State(state): State<AppState>,
    user: UserId,
    Path(record_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    Span::current().record(logging::RECORD_ID, record_id.as_str());

    match state.records.delete(user.as_str(), &record_id).await? {
        Some(item) => {
            info!(
                subsystem = "api",
                component = "records",
                op = "delete",
                photo_count = item.photo_keys.len(),
                "Deleted record"
            );
            reclaim_photos(&state, &item).await;
        }
        None => debug!(
            subsystem = "api",
            component = "records",
            op = "delete",
            "Delete of absent record"
        ),
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Best-effort removal of a deleted record's photo objects and thumbnails.
///
/// Keys outside the owner's namespace are skipped. Failures are logged only.
async fn reclaim_photos(state: &AppState, item: &RecordItem) {
    let mut keys = Vec::with_capacity(item.photo_keys.len() * 2);
    for key in &item.photo_keys {
        if !is_owned_photo_key(&item.user_id, key) {
            warn!(
                subsystem = "api",
                component = "records",
                op = "reclaim_photos",
                key = %key,
                "Skipping photo key outside the owner's namespace"
            );
            continue;
        }
        let thumbnail = thumbnail_key(key);
        if thumbnail != *key {
            keys.push(thumbnail);
        }
        keys.push(key.clone());
    }

    let results = join_all(keys.iter().map(|key| state.photos.delete_object(key))).await;
    for (key, result) in keys.iter().zip(results) {
        if let Err(e) = result {
            warn!(
                subsystem = "api",
                component = "records",
                op = "reclaim_photos",
                key = %key,
                error = %e,
                "Failed to delete photo object"
            );
        }
    }
}
