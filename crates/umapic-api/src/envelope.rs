//! Success envelope: `{"data": <payload>}`.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

/// Wrap `payload` in the success envelope.
pub fn data<T: Serialize>(payload: T) -> Json<Data<T>> {
    Json(Data { data: payload })
}
