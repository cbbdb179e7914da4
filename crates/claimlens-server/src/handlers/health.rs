//! Health check handler

use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

/// Liveness probe. Never touches the claim store, so it answers 200
/// even when the store is down.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
