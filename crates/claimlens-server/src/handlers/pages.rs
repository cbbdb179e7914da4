//! Landing page handler

use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use claimlens_core::ClaimlensError;

/// Serve the landing page from the configured static directory. The
/// asset lives outside this service; if it cannot be read the error
/// names the path the operator pointed us at.
pub async fn index(State(state): State<AppState>) -> Response {
    let path = state.config.static_dir.join("index.html");

    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            let err = ClaimlensError::Asset(format!(
                "failed to load landing page from {}: {}",
                path.display(),
                e
            ));
            tracing::error!("{}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}
