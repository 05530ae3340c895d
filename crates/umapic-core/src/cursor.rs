//! Pagination cursor codec.
//!
//! A cursor carries the last position of a page back to the client and is
//! echoed verbatim on the next request, so it is treated as untrusted input.
//! Tokens are versioned and signed:
//!
//! ```text
//! v1.<base64url(json payload)>.<base64url(hmac-sha256(secret, payload part))>
//! ```
//!
//! The signing secret is process configuration; rotating it invalidates all
//! outstanding cursors, which only costs clients a restart from page one.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::defaults::{CURSOR_TOKEN_MAX_LEN, SORT_VISIT_DATE};
use crate::models::SortOrder;

type HmacSha256 = Hmac<Sha256>;
const CURSOR_VERSION_V1: &str = "v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CursorErrorCode {
    InvalidFormat,
    UnsupportedVersion,
    InvalidSignature,
    InvalidPayload,
    OrderMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code:?}: {message}")]
pub struct CursorError {
    pub code: CursorErrorCode,
    pub message: String,
}

impl CursorError {
    #[must_use]
    pub fn new(code: CursorErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Where the next page of a visit-date range scan starts (exclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumePosition {
    pub visit_date: String,
    pub record_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CursorPayload {
    v: String,
    sort: String,
    order: SortOrder,
    #[serde(flatten)]
    position: ResumePosition,
}

/// Signs and verifies pagination cursors.
#[derive(Clone)]
pub struct CursorCodec {
    secret: Vec<u8>,
}

impl std::fmt::Debug for CursorCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorCodec").finish_non_exhaustive()
    }
}

impl CursorCodec {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, CursorError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| CursorError::new(CursorErrorCode::InvalidPayload, e.to_string()))
    }

    /// Encode a resume position for a scan in `order`.
    pub fn encode(
        &self,
        order: SortOrder,
        position: &ResumePosition,
    ) -> Result<String, CursorError> {
        let payload = CursorPayload {
            v: CURSOR_VERSION_V1.to_string(),
            sort: SORT_VISIT_DATE.to_string(),
            order,
            position: position.clone(),
        };
        let payload_bytes = serde_json::to_vec(&payload)
            .map_err(|e| CursorError::new(CursorErrorCode::InvalidPayload, e.to_string()))?;
        let payload_part = URL_SAFE_NO_PAD.encode(payload_bytes);

        let mut mac = self.mac()?;
        mac.update(payload_part.as_bytes());
        let sig_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}.{}", CURSOR_VERSION_V1, payload_part, sig_part))
    }

    /// Verify `token` and recover the resume position.
    ///
    /// `order` is the order of the request presenting the cursor; a cursor
    /// minted for the opposite direction is rejected.
    pub fn decode(&self, token: &str, order: SortOrder) -> Result<ResumePosition, CursorError> {
        if token.len() > CURSOR_TOKEN_MAX_LEN {
            return Err(CursorError::new(
                CursorErrorCode::InvalidFormat,
                "cursor exceeds max length",
            ));
        }
        let (payload_part, sig_part) = parse_cursor_parts(token)?;

        let signature = URL_SAFE_NO_PAD
            .decode(sig_part)
            .map_err(|e| CursorError::new(CursorErrorCode::InvalidFormat, e.to_string()))?;
        let mut mac = self.mac()?;
        mac.update(payload_part.as_bytes());
        mac.verify_slice(&signature).map_err(|_| {
            CursorError::new(
                CursorErrorCode::InvalidSignature,
                "cursor signature mismatch",
            )
        })?;

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(payload_part)
            .map_err(|e| CursorError::new(CursorErrorCode::InvalidFormat, e.to_string()))?;
        let payload: CursorPayload = serde_json::from_slice(&payload_bytes)
            .map_err(|e| CursorError::new(CursorErrorCode::InvalidPayload, e.to_string()))?;

        if payload.v != CURSOR_VERSION_V1 {
            return Err(CursorError::new(
                CursorErrorCode::UnsupportedVersion,
                "cursor version unsupported",
            ));
        }
        if payload.sort != SORT_VISIT_DATE {
            return Err(CursorError::new(
                CursorErrorCode::InvalidPayload,
                format!("cursor sort key unsupported: {}", payload.sort),
            ));
        }
        if payload.order != order {
            return Err(CursorError::new(
                CursorErrorCode::OrderMismatch,
                "cursor was issued for a different sort order",
            ));
        }

        Ok(payload.position)
    }
}

fn parse_cursor_parts(token: &str) -> Result<(&str, &str), CursorError> {
    let parts: Vec<&str> = token.split('.').collect();
    match parts.as_slice() {
        [version, payload, sig] if *version == CURSOR_VERSION_V1 => Ok((payload, sig)),
        [version, _, _] => Err(CursorError::new(
            CursorErrorCode::UnsupportedVersion,
            format!("unsupported cursor version: {version}"),
        )),
        _ => Err(CursorError::new(
            CursorErrorCode::InvalidFormat,
            "invalid cursor format",
        )),
    }
}
