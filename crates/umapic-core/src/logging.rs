//! Structured logging schema and field name constants.
//!
//! The HTTP trace span is opened with these fields left empty and the request
//! pipeline fills them in with `Span::record` once they are known, so every
//! event emitted while handling a request carries the caller and the record.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Storage failure surfaced to the caller as `INTERNAL_ERROR` |
//! | WARN  | Recoverable issue, e.g. best-effort photo cleanup failed |
//! | INFO  | Lifecycle events (startup, shutdown), record mutations |
//! | DEBUG | Decision points, query shapes, clamped parameters |

/// Opaque caller identifier from the `X-User-ID` header.
pub const USER_ID: &str = "user_id";

/// Record identifier being operated on.
pub const RECORD_ID: &str = "record_id";
