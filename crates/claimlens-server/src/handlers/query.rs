//! Aggregation query handler
//!
//! One linear sequence per request: validate, acquire a pooled
//! connection, run the four statements, respond. No retries.

use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use claimlens_core::{AggregatedRow, ClaimlensError, CreatorStats};
use serde::{Deserialize, Serialize};
use serde_json::json;

const DEFAULT_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
struct QueryRequest {
    creator: Option<String>,
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    success: bool,
    #[serde(flatten)]
    stats: CreatorStats,
    preview_rows: usize,
    data: Vec<AggregatedRow>,
}

pub async fn query(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    match run_query(&state, &body).await {
        Ok(response) => {
            let value = serde_json::to_value(&response).unwrap_or_else(|e| {
                json!({ "error": format!("Request failed: {}", e) })
            });
            (StatusCode::OK, Json(value))
        }
        Err(e) => {
            let status = match e {
                ClaimlensError::Validation(_) => StatusCode::BAD_REQUEST,
                _ => {
                    tracing::error!("Query request failed: {}", e);
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (status, Json(json!({ "error": e.to_string() })))
        }
    }
}

async fn run_query(
    state: &AppState,
    body: &[u8],
) -> Result<QueryResponse, ClaimlensError> {
    let (creator, limit) = parse_request(body)?;

    // One connection per request; dropping it at the end of this scope
    // returns it to the pool on success and failure alike
    let mut conn = state.db.acquire().await?;

    let total_claims = state.db.count_claims(&mut conn, &creator).await?;
    let unique_addresses = state.db.unique_address_count(&mut conn, &creator).await?;
    let total_value_sum = state.db.total_value_sum(&mut conn, &creator).await?;
    let data = state.db.query_rows(&mut conn, &creator, limit).await?;

    tracing::info!(
        "Creator {} aggregated: {} claims, {} addresses, {} preview rows",
        creator,
        total_claims,
        unique_addresses,
        data.len()
    );

    Ok(QueryResponse {
        success: true,
        stats: CreatorStats {
            creator,
            total_claims,
            unique_addresses,
            total_value_sum,
        },
        preview_rows: data.len(),
        data,
    })
}

/// Parse and validate the request body. A body that is not JSON, or
/// carries wrong-typed fields, answers 500 `Request failed` (the
/// contract inherited from the original service); a missing or empty
/// creator answers 400.
fn parse_request(body: &[u8]) -> Result<(String, i64), ClaimlensError> {
    let request: QueryRequest =
        serde_json::from_slice(body).map_err(|e| ClaimlensError::Request(e.to_string()))?;

    let creator = request.creator.unwrap_or_default();
    let creator = creator.trim();
    if creator.is_empty() {
        return Err(ClaimlensError::Validation(
            "creator address is required".to_string(),
        ));
    }

    Ok((creator.to_string(), request.limit.unwrap_or(DEFAULT_LIMIT)))
}
