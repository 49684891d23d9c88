//! Financial summary and streamed insight handlers

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use futures::TryStreamExt;
use serde::Deserialize;
use tracing::{info, warn};

use fincopilot_core::models::FinancialSummary;
use fincopilot_core::ScorePolicy;

use crate::{AppError, AppState, AuthUser};

/// Query parameters for summary endpoints
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    /// `baseline` or `weighted`; server default when absent
    pub score_policy: Option<String>,
}

impl SummaryQuery {
    fn policy(&self, default: ScorePolicy) -> Result<ScorePolicy, AppError> {
        match self.score_policy.as_deref() {
            Some(raw) => raw.parse().map_err(|e: String| AppError::bad_request(&e)),
            None => Ok(default),
        }
    }
}

fn summarize(
    state: &AppState,
    auth: &AuthUser,
    query: &SummaryQuery,
) -> Result<FinancialSummary, AppError> {
    let policy = query.policy(state.config.score_policy)?;
    Ok(state.db.summarize_user(auth.id, policy)?)
}

/// GET /api/summary - Totals, savings and score for the caller
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<FinancialSummary>, AppError> {
    Ok(Json(summarize(&state, &auth, &query)?))
}

/// GET /api/ai-stream - Relay streamed advice as plain text
///
/// The body is written chunk by chunk as the backend produces text. If the
/// backend fails mid-stream the body is cut short; the status line has
/// already been sent by then.
pub async fn ai_stream(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<SummaryQuery>,
) -> Result<Response, AppError> {
    let generator = state
        .insight
        .as_ref()
        .ok_or_else(|| AppError::service_unavailable("AI backend not configured"))?;

    let summary = summarize(&state, &auth, &query)?;
    let stream = generator.generate_insight(&summary).await?;

    state.db.log_audit(
        auth.actor(),
        "stream",
        Some("insight"),
        Some(auth.id),
        Some(&format!("score={}", summary.financial_score)),
    )?;
    info!(user_id = auth.id, "Streaming insight");

    let user_id = auth.id;
    let body = Body::from_stream(stream.inspect_err(move |e| {
        warn!(user_id, error = %e, "Insight stream ended with error");
    }));

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}
