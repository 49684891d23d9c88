//! FinCopilot Web Server
//!
//! Axum-based REST API for the FinCopilot personal finance backend.
//!
//! Security features:
//! - Bearer token authentication (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Input validation (amounts, labels, credentials)
//! - Audit logging for writes and insight requests
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use fincopilot_core::ai::{AIClient, InsightBackend};
use fincopilot_core::db::Database;
use fincopilot_core::{InsightGenerator, PromptLibrary, ScorePolicy};

mod handlers;
pub mod tokens;

pub use tokens::{issue_token, verify_token, Claims, TokenConfig};

/// Header naming the acting user when authentication is disabled
pub const USER_ID_HEADER: &str = "x-user-id";

/// Environment variable with comma-separated CORS origins
pub const ALLOWED_ORIGINS_ENV: &str = "FINCOPILOT_ALLOWED_ORIGINS";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only in production)
    pub allowed_origins: Vec<String>,
    /// Token signing secret and lifetime
    pub tokens: TokenConfig,
    /// Policy used when a request doesn't name one
    pub score_policy: ScorePolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            tokens: TokenConfig::default(),
            score_policy: ScorePolicy::default(),
        }
    }
}

/// Parse a comma-separated list of CORS origins
pub fn parse_allowed_origins(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// None when no AI backend is configured
    pub insight: Option<InsightGenerator>,
}

/// How the caller was identified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Token,
    /// `X-User-Id` header, only honored with auth disabled
    Header,
}

/// The caller, resolved by the auth middleware
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub method: AuthMethod,
}

impl AuthUser {
    /// Actor name recorded in the audit log
    pub fn actor(&self) -> &str {
        &self.email
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authentication middleware - resolves the caller and attaches an `AuthUser`
///
/// A bearer token is always honored. Without one, the `X-User-Id` header is
/// accepted only when authentication is disabled. Either way the user must
/// exist in the ledger.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let resolved = match bearer_token(&request) {
        Some(token) => match verify_token(token, &state.config.tokens) {
            Ok(claims) => claims.user_id().map(|id| (id, AuthMethod::Token)),
            Err(e) => {
                warn!(error = %e, path = %path, "Invalid bearer token");
                return unauthorized("Invalid or expired token");
            }
        },
        None if !state.config.require_auth => request
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|id| (id, AuthMethod::Header)),
        None => None,
    };

    let Some((user_id, method)) = resolved else {
        warn!(path = %path, "Unauthorized request - no valid auth");
        return unauthorized("Authentication required");
    };

    let user = match state.db.get_user(user_id) {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!(user_id, path = %path, "Request for unknown user");
            return unauthorized("Unknown user");
        }
        Err(e) => return AppError::from(e).into_response(),
    };

    tracing::debug!(user = %user.email, ?method, path = %path, "Authenticated");
    request.extensions_mut().insert(AuthUser {
        id: user.id,
        email: user.email,
        method,
    });
    next.run(request).await
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let ai = AIClient::from_env();
    match ai {
        Some(ref client) => info!(
            "AI backend configured: {} (model: {})",
            client.host(),
            client.model()
        ),
        None => info!("ℹ️  AI backend not configured (set GROQ_API_KEY to enable insights)"),
    }

    create_router_with_options(db, config, ai, &mut PromptLibrary::new())
}

/// Create the application router with an explicit AI client and prompt library (for testing)
pub fn create_router_with_options(
    db: Database,
    config: ServerConfig,
    ai: Option<AIClient>,
    prompts: &mut PromptLibrary,
) -> Router {
    let insight = ai.and_then(|client| {
        match InsightGenerator::from_library(client.clone(), prompts) {
            Ok(generator) => Some(generator),
            Err(e) => {
                warn!(error = %e, "Invalid prompt override, using embedded prompt");
                InsightGenerator::from_library(client, &mut PromptLibrary::embedded_only()).ok()
            }
        }
    });

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        insight,
    });

    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login));

    let protected_routes = Router::new()
        .route("/me", get(handlers::get_me))
        .route(
            "/income",
            get(handlers::list_income).post(handlers::add_income),
        )
        .route(
            "/expenses",
            get(handlers::list_expenses).post(handlers::add_expense),
        )
        .route("/summary", get(handlers::get_summary))
        .route("/ai-stream", get(handlers::ai_stream))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .route("/", get(handlers::root))
        .nest("/api", public_routes.merge(protected_routes))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    }

    if !config.tokens.is_configured() {
        if config.require_auth {
            anyhow::bail!(
                "{} must be set when authentication is enabled",
                tokens::JWT_SECRET_ENV
            );
        }
        warn!("No token secret configured; /api/login is disabled");
    }

    check_ai_connection().await;

    let app = create_router(db, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection() {
    match AIClient::from_env() {
        Some(client) => {
            if client.health_check().await {
                info!(
                    "✅ AI backend connected: {} (model: {})",
                    client.host(),
                    client.model()
                );
            } else {
                warn!(
                    "⚠️  AI backend configured but not responding: {} (model: {})",
                    client.host(),
                    client.model()
                );
            }
        }
        None => {
            info!("ℹ️  AI backend not configured (set GROQ_API_KEY to enable insights)");
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn service_unavailable(msg: &str) -> Self {
        Self::with_status(StatusCode::SERVICE_UNAVAILABLE, msg)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        use fincopilot_core::Error as CoreError;

        let err = err.into();

        // Caller mistakes keep their message; everything else is sanitized
        if let Some(core) = err.downcast_ref::<CoreError>() {
            let status = match core {
                CoreError::InvalidData(_) => Some(StatusCode::BAD_REQUEST),
                CoreError::NotFound(_) => Some(StatusCode::NOT_FOUND),
                CoreError::Conflict(_) => Some(StatusCode::CONFLICT),
                CoreError::Auth(_) => Some(StatusCode::UNAUTHORIZED),
                CoreError::Ai(_) => Some(StatusCode::BAD_GATEWAY),
                _ => None,
            };
            if let Some(status) = status {
                return Self::with_status(status, &core.to_string());
            }
        }

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
