//! HTTP handlers, one module per resource.

pub mod health;
pub mod records;
pub mod uploads;

pub use health::health;
pub use records::{create_record, delete_record, get_record, list_records, update_record};
pub use uploads::get_upload_urls;
