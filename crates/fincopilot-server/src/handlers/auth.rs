//! Registration, login and the current user

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use fincopilot_core::credentials::{hash_password, verify_password};
use fincopilot_core::models::{NewUser, User};

use super::read_json;
use crate::{issue_token, AppError, AppState, AuthUser};

/// Request body for registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for a successful login
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Lifetime in seconds
    pub expires_in: i64,
}

/// POST /api/register - Create a user
pub async fn register(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<User>), AppError> {
    let req: RegisterRequest = read_json(request).await?;

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;
    let user = state.db.create_user(&NewUser {
        name: req.name,
        email: req.email,
        password_hash,
    })?;

    state
        .db
        .log_audit(&user.email, "register", Some("user"), Some(user.id), None)?;
    info!(user_id = user.id, "Registered user");

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/login - Exchange credentials for a bearer token
pub async fn login(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<TokenResponse>, AppError> {
    let req: LoginRequest = read_json(request).await?;

    if !state.config.tokens.is_configured() {
        return Err(AppError::service_unavailable(
            "Token signing is not configured",
        ));
    }

    // Same answer for unknown email and wrong password
    let invalid = || AppError::unauthorized("Invalid email or password");

    let user = state.db.get_user_by_email(&req.email)?.ok_or_else(invalid)?;
    let password = req.password;
    let stored_hash = user.password_hash.clone();
    let matches =
        tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash)).await??;
    if !matches {
        warn!(user_id = user.id, "Failed login");
        state
            .db
            .log_audit(&user.email, "login_failed", Some("user"), Some(user.id), None)?;
        return Err(invalid());
    }

    let access_token = issue_token(&user, &state.config.tokens)?;
    state
        .db
        .log_audit(&user.email, "login", Some("user"), Some(user.id), None)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        expires_in: state.config.tokens.ttl_seconds(),
    }))
}

/// GET /api/me - The authenticated user
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<User>, AppError> {
    let user = state.db.require_user(auth.id)?;
    Ok(Json(user))
}
