//! # umapic-core
//!
//! Core types, traits, and abstractions for the Umapic visit log.
//!
//! This crate provides the record model, the storage traits that the database
//! crate implements, the pagination cursor codec, the public read projections
//! and upload slot issuance. It has no I/O of its own.

pub mod cursor;
pub mod defaults;
pub mod error;
pub mod ids;
pub mod logging;
pub mod models;
pub mod projection;
pub mod timestamps;
pub mod traits;
pub mod upload;

// Re-export commonly used types at crate root
pub use cursor::{CursorCodec, CursorError, CursorErrorCode, ResumePosition};
pub use error::{Error, Result};
pub use ids::{is_safe_segment, new_record_id};
pub use models::*;
pub use projection::{
    thumbnail_key, Photo, PhotoUrls, RecordCreated, RecordDetail, RecordList, RecordSummary,
    RecordUpdated,
};
pub use timestamps::{format_timestamp, next_updated_at, now_millis};
pub use traits::*;
pub use upload::{
    is_owned_photo_key, issue_upload_urls, photo_key, UploadBatch, UploadParams, UploadSlot,
};
