//! Liveness endpoint.

use axum::Json;
use serde::Serialize;

use crate::envelope::{data, Data};

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /health`. Needs no identity header and touches no storage.
pub async fn health() -> Json<Data<Health>> {
    data(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
