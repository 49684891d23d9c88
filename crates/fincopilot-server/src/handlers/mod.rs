//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod auth;
pub mod entries;
pub mod health;
pub mod summary;

// Re-export all handlers for use in router
pub use auth::*;
pub use entries::*;
pub use health::*;
pub use summary::*;

use axum::extract::Request;
use serde::de::DeserializeOwned;

use crate::AppError;

/// Largest JSON body any handler accepts
const MAX_JSON_BODY: usize = 16 * 1024;

/// Read a JSON body, answering 400 (not axum's 422) for anything malformed
pub(crate) async fn read_json<T: DeserializeOwned>(request: Request) -> Result<T, AppError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_JSON_BODY)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::bad_request(&format!("Invalid JSON: {}", e)))
}
