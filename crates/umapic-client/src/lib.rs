//! # umapic-client
//!
//! Typed HTTP client for the Umapic visit-log API.
//!
//! Every call carries the caller's `X-User-ID`. Server failures come back
//! as [`ClientError::Api`] with the envelope code; anything the client has
//! to classify itself gets one of the client-side codes.
//!
//! ```rust,ignore
//! use umapic_client::{ListRecordsParams, UmapicClient};
//!
//! let client = UmapicClient::new("http://localhost:3000", "user-1")?;
//! let page = client.list_records(&ListRecordsParams::default()).await?;
//! for record in page.records {
//!     println!("{} {}", record.visit_date, record.store_name);
//! }
//! ```

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use umapic_core::defaults::{PHOTO_CONTENT_TYPE, SORT_VISIT_DATE};
use umapic_core::{
    CreateRecordRequest, RecordCreated, RecordDetail, RecordList, RecordUpdated, SortOrder,
    UpdateRecordRequest, UploadBatch,
};

/// Per-request timeout.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Header carrying the caller identity.
const USER_ID_HEADER: &str = "X-User-ID";

/// Errors surfaced by [`UmapicClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with an error envelope.
    #[error("{code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Non-2xx response without a decodable error envelope.
    #[error("HTTP error: {status}")]
    Http { status: u16 },

    /// 2xx response whose body did not match the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The storage `PUT` of a photo was refused.
    #[error("Photo upload failed with status {status}")]
    UploadFailed { status: u16 },

    /// Connection, timeout or other transport failure.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// UPPER_SNAKE classification code.
    pub fn code(&self) -> &str {
        match self {
            ClientError::Api { code, .. } => code,
            ClientError::Http { .. } => "HTTP_ERROR",
            ClientError::InvalidResponse(_) => "INVALID_RESPONSE",
            ClientError::UploadFailed { .. } => "UPLOAD_FAILED",
            ClientError::Transport(_) => "TRANSPORT_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

/// Listing options. Unset fields use the server defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRecordsParams {
    pub order: Option<SortOrder>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub keyword: Option<String>,
}

impl ListRecordsParams {
    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("sort", SORT_VISIT_DATE.to_string())];
        if let Some(order) = self.order {
            query.push(("order", order.as_str().to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(cursor) = &self.cursor {
            query.push(("cursor", cursor.clone()));
        }
        if let Some(keyword) = &self.keyword {
            query.push(("keyword", keyword.clone()));
        }
        query
    }
}

/// Client bound to one API base URL and one user.
#[derive(Debug, Clone)]
pub struct UmapicClient {
    client: Client,
    base_url: String,
    user_id: String,
}

impl UmapicClient {
    pub fn new(base_url: impl Into<String>, user_id: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_http_client(client, base_url, user_id))
    }

    /// Use a preconfigured reqwest client.
    pub fn with_http_client(
        client: Client,
        base_url: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(USER_ID_HEADER, &self.user_id)
    }

    /// One page of records.
    pub async fn list_records(&self, params: &ListRecordsParams) -> Result<RecordList> {
        let request = self
            .request(Method::GET, "/records")
            .query(&params.to_query());
        self.send_data(request).await
    }

    pub async fn get_record(&self, record_id: &str) -> Result<RecordDetail> {
        self.send_data(self.request(Method::GET, &record_path(record_id)))
            .await
    }

    pub async fn create_record(&self, body: &CreateRecordRequest) -> Result<RecordCreated> {
        self.send_data(self.request(Method::POST, "/records").json(body))
            .await
    }

    /// Partial update; only fields set on `body` are sent.
    pub async fn update_record(
        &self,
        record_id: &str,
        body: &UpdateRecordRequest,
    ) -> Result<RecordUpdated> {
        let request = self
            .request(Method::PUT, &record_path(record_id))
            .json(body);
        self.send_data(request).await
    }

    pub async fn delete_record(&self, record_id: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, &record_path(record_id))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_failure(status, response).await);
        }
        debug!(subsystem = "client", op = "delete_record", record_id, "Deleted record");
        Ok(())
    }

    /// Presigned upload slots; `record_id` adds photos to an existing record.
    pub async fn get_upload_urls(
        &self,
        count: u32,
        record_id: Option<&str>,
    ) -> Result<UploadBatch> {
        let mut query = vec![("count", count.to_string())];
        if let Some(record_id) = record_id {
            query.push(("recordId", record_id.to_string()));
        }
        self.send_data(self.request(Method::GET, "/s3-upload-url").query(&query))
            .await
    }

    /// `PUT` JPEG bytes to a presigned upload URL.
    ///
    /// Goes straight to storage, so no identity header is sent.
    pub async fn upload_photo(&self, upload_url: &str, bytes: Vec<u8>) -> Result<()> {
        let size = bytes.len();
        let response = self
            .client
            .put(upload_url)
            .header(reqwest::header::CONTENT_TYPE, PHOTO_CONTENT_TYPE)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::UploadFailed {
                status: status.as_u16(),
            });
        }
        debug!(subsystem = "client", op = "upload_photo", size, "Uploaded photo");
        Ok(())
    }

    async fn send_data<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_failure(status, response).await);
        }

        let body = response.bytes().await?;
        serde_json::from_slice::<DataEnvelope<T>>(&body)
            .map(|envelope| envelope.data)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

/// `/records/{id}` with the id percent-encoded as a single path segment.
fn record_path(record_id: &str) -> String {
    format!("/records/{}", urlencoding::encode(record_id))
}

/// Turn a non-2xx response into an error, preferring the server's envelope.
async fn classify_failure(status: StatusCode, response: Response) -> ClientError {
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => return ClientError::Transport(e),
    };
    match serde_json::from_slice::<ErrorEnvelope>(&body) {
        Ok(envelope) => ClientError::Api {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope.error.message,
            details: envelope.error.details,
        },
        Err(_) => ClientError::Http {
            status: status.as_u16(),
        },
    }
}
