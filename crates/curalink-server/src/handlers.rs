//! Health and info endpoints.

use axum::Json;
use axum::http::StatusCode;
use serde_json::{Value, json};

pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "curalink-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn readyz() -> StatusCode {
    StatusCode::OK
}
