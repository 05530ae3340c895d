//! # umapic-api
//!
//! HTTP API for the Umapic visit log.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | `/records` | list the caller's records |
//! | POST | `/records` | create a record |
//! | GET | `/records/:record_id` | record detail |
//! | PUT, PATCH | `/records/:record_id` | partial update |
//! | DELETE | `/records/:record_id` | delete and reclaim photos |
//! | GET | `/s3-upload-url` | presigned photo upload URLs |
//! | GET | `/health` | liveness |

pub mod config;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Method, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use umapic_core::defaults::{MAX_BODY_BYTES, USER_ID_HEADER};
use umapic_core::{CursorCodec, PhotoStorage, PhotoUrls, RecordRepository};

pub use config::{AppConfig, StoreBackend};
pub use error::ApiError;

/// Shared handler state. Cloned per request; holds no mutable data.
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<dyn RecordRepository>,
    pub photos: Arc<dyn PhotoStorage>,
    pub cursor: CursorCodec,
    pub urls: PhotoUrls,
    pub upload_url_expires: Duration,
}

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Request span. `user_id` and `record_id` are recorded by the handlers.
fn make_request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id,
        user_id = tracing::field::Empty,
        record_id = tracing::field::Empty,
    )
}

/// Unknown paths.
async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}

/// Wrap bodies of framework-generated errors (405 from method routing, 413
/// from the body limit) in the error envelope. Headers such as `Allow` and
/// the CORS set are kept.
async fn envelope_bare_errors(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));
    if is_json {
        return response;
    }
    let error = match response.status() {
        StatusCode::NOT_FOUND => ApiError::RouteNotFound,
        StatusCode::METHOD_NOT_ALLOWED => ApiError::MethodNotAllowed,
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge,
        _ => return response,
    };

    let (parts, _) = response.into_parts();
    let mut enveloped = error.into_response();
    for (name, value) in &parts.headers {
        if *name != header::CONTENT_TYPE && *name != header::CONTENT_LENGTH {
            enveloped
                .headers_mut()
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }
    enveloped
}

/// Router with the default body limit.
pub fn app(state: AppState) -> Router {
    app_with_body_limit(state, MAX_BODY_BYTES)
}

/// Router with every route and middleware layer.
pub fn app_with_body_limit(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/records",
            get(handlers::list_records).post(handlers::create_record),
        )
        .route(
            "/records/:record_id",
            get(handlers::get_record)
                .put(handlers::update_record)
                .patch(handlers::update_record)
                .delete(handlers::delete_record),
        )
        .route("/s3-upload-url", get(handlers::get_upload_urls))
        .fallback(route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http().make_span_with(make_request_span)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                    HeaderName::from_static(USER_ID_HEADER),
                ])
                .max_age(Duration::from_secs(3600)),
        )
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(middleware::map_response(envelope_bare_errors))
        // Outermost, so responses short-circuited by inner layers carry it too.
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .with_state(state)
}
