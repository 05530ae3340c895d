//! Centralized default constants for the Umapic service.
//!
//! All crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for `GET /records`.
pub const LIST_LIMIT: u32 = 20;

/// Upper bound for the `limit` query parameter. Larger values are clamped.
pub const LIST_LIMIT_MAX: u32 = 100;

/// The only sort key backed by an index.
pub const SORT_VISIT_DATE: &str = "visitDate";

// =============================================================================
// CURSOR
// =============================================================================

/// Longest cursor token accepted before any decoding is attempted.
pub const CURSOR_TOKEN_MAX_LEN: usize = 1024;

// =============================================================================
// UPLOADS
// =============================================================================

/// Default number of upload slots issued per call.
pub const UPLOAD_COUNT: u32 = 1;

/// Upper bound for the `count` query parameter. Larger values are clamped.
pub const UPLOAD_COUNT_MAX: u32 = 5;

/// Lifetime of a presigned upload URL in seconds.
pub const UPLOAD_URL_EXPIRES_SECS: u64 = 3600;

/// Content type every photo upload is signed for.
pub const PHOTO_CONTENT_TYPE: &str = "image/jpeg";

/// Key prefix for all photo objects.
pub const PHOTO_KEY_PREFIX: &str = "photos";

/// Path segment marking the uploaded original.
pub const ORIGINAL_SEGMENT: &str = "/original/";

/// Path segment where the out-of-band thumbnailer writes its output.
pub const THUMBNAIL_SEGMENT: &str = "/thumbnail/";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Header carrying the caller's opaque user identifier.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Default request body limit in bytes.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;
