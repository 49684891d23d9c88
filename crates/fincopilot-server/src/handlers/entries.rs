//! Income and expense handlers

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use fincopilot_core::models::{ExpenseEntry, IncomeEntry, NewEntry};

use super::read_json;
use crate::{AppError, AppState, AuthUser};

/// Request body for recording income
#[derive(Debug, Deserialize)]
pub struct CreateIncomeRequest {
    pub amount: f64,
    pub source: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Request body for recording an expense
#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub amount: f64,
    pub category: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// POST /api/income - Record income for the caller
pub async fn add_income(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    request: Request,
) -> Result<(StatusCode, Json<IncomeEntry>), AppError> {
    let req: CreateIncomeRequest = read_json(request).await?;

    let entry = state
        .db
        .add_income(auth.id, &NewEntry::new(req.amount, &req.source, req.date))?;

    state.db.log_audit(
        auth.actor(),
        "create",
        Some("income"),
        Some(entry.id),
        Some(&format!("amount={}", entry.amount)),
    )?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /api/income - The caller's income, newest first
pub async fn list_income(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<IncomeEntry>>, AppError> {
    Ok(Json(state.db.list_income(auth.id)?))
}

/// POST /api/expenses - Record an expense for the caller
pub async fn add_expense(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    request: Request,
) -> Result<(StatusCode, Json<ExpenseEntry>), AppError> {
    let req: CreateExpenseRequest = read_json(request).await?;

    let entry = state
        .db
        .add_expense(auth.id, &NewEntry::new(req.amount, &req.category, req.date))?;

    state.db.log_audit(
        auth.actor(),
        "create",
        Some("expense"),
        Some(entry.id),
        Some(&format!("amount={}", entry.amount)),
    )?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /api/expenses - The caller's expenses, newest first
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<ExpenseEntry>>, AppError> {
    Ok(Json(state.db.list_expenses(auth.id)?))
}
