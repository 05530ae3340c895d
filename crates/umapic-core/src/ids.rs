//! Record identifiers.
//!
//! New records get a UUIDv7 rendered in its hyphenated form. UUIDv7 embeds a
//! Unix timestamp (milliseconds) in the first 48 bits, so the string form
//! sorts lexicographically by creation time.

use uuid::Uuid;

/// Mint a new record identifier.
///
/// # Example
///
/// ```
/// use umapic_core::ids::new_record_id;
///
/// let a = new_record_id();
/// assert_eq!(a.len(), 36);
/// ```
pub fn new_record_id() -> String {
    Uuid::now_v7().as_hyphenated().to_string()
}

/// Whether `segment` can be embedded in an object key as one path component.
pub fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains('/')
        && !segment.contains('\\')
        && !segment.chars().any(char::is_control)
}
