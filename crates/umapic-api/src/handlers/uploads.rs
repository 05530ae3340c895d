//! Upload URL handler.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::Span;

use umapic_core::{issue_upload_urls, logging, UploadBatch, UploadParams};

use crate::envelope::{data, Data};
use crate::error::ApiError;
use crate::extract::UserId;
use crate::AppState;

/// Query parameters for `GET /s3-upload-url`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlQuery {
    pub count: Option<String>,
    pub record_id: Option<String>,
}

/// Issue presigned photo upload URLs.
///
/// # Query Parameters
/// - `count`: number of slots, default 1, clamped to 5
/// - `recordId`: existing record to add photos to; a new id is minted if absent
///
/// # Returns
/// - 200 OK with `{recordId, uploadUrls: [{index, uploadUrl, key, expiresAt}]}`
/// - 400 Bad Request for an invalid count or an id unusable as a key segment
pub async fn get_upload_urls(
    State(state): State<AppState>,
    user: UserId,
    query: Result<Query<UploadUrlQuery>, QueryRejection>,
) -> Result<Json<Data<UploadBatch>>, ApiError> {
    let Query(query) = query?;
    let params = UploadParams::parse(query.count.as_deref(), query.record_id)?;

    let batch = issue_upload_urls(
        state.photos.as_ref(),
        user.as_str(),
        params,
        state.upload_url_expires,
    )
    .await?;

    Span::current().record(logging::RECORD_ID, batch.record_id.as_str());
    Ok(data(batch))
}
