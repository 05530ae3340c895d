//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::Span;

use umapic_core::defaults::USER_ID_HEADER;
use umapic_core::{logging, Error};

use crate::error::ApiError;

/// Caller identity taken from the `X-User-ID` header.
///
/// The value is trusted as supplied; there is no authentication behind it.
/// A missing or blank header rejects the request with `UNAUTHORIZED` before
/// any handler logic runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Unauthorized("X-User-ID header is required".to_string()))?;

        Span::current().record(logging::USER_ID, user_id);
        Ok(UserId(user_id.to_string()))
    }
}
