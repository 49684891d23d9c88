//! Bearer tokens handed out at login
//!
//! HS256-signed JWTs whose subject is the user id. Validation checks the
//! signature and expiry (with jsonwebtoken's default leeway).

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use fincopilot_core::User;

/// Environment variable holding the signing secret
pub const JWT_SECRET_ENV: &str = "FINCOPILOT_JWT_SECRET";

/// Environment variable overriding token lifetime (minutes)
pub const TOKEN_TTL_ENV: &str = "FINCOPILOT_TOKEN_TTL_MINUTES";

/// Default token lifetime in minutes
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 60;

/// Longest lifetime accepted from the environment (30 days)
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 30;

/// Parse a token lifetime in minutes, capped at [`MAX_TOKEN_TTL_MINUTES`]
///
/// Unparseable or non-positive values fall back to the default.
pub fn parse_ttl_minutes(raw: &str) -> i64 {
    match raw.trim().parse::<i64>() {
        Ok(minutes) if minutes > MAX_TOKEN_TTL_MINUTES => {
            tracing::warn!(
                value = minutes,
                max = MAX_TOKEN_TTL_MINUTES,
                "{} too large, capping",
                TOKEN_TTL_ENV
            );
            MAX_TOKEN_TTL_MINUTES
        }
        Ok(minutes) if minutes > 0 => minutes,
        _ => {
            tracing::warn!(value = %raw, "Invalid {}, using default", TOKEN_TTL_ENV);
            DEFAULT_TOKEN_TTL_MINUTES
        }
    }
}

/// Token signing configuration
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
        }
    }
}

impl TokenConfig {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            ..Default::default()
        }
    }

    /// Read `FINCOPILOT_JWT_SECRET` and `FINCOPILOT_TOKEN_TTL_MINUTES`
    pub fn from_env() -> Self {
        let secret = std::env::var(JWT_SECRET_ENV).unwrap_or_default();
        let ttl_minutes = match std::env::var(TOKEN_TTL_ENV) {
            Ok(raw) => parse_ttl_minutes(&raw),
            Err(_) => DEFAULT_TOKEN_TTL_MINUTES,
        };
        Self {
            secret,
            ttl_minutes,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Token lifetime in seconds
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_minutes.saturating_mul(60)
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// Sign a token for the user
pub fn issue_token(
    user: &User,
    config: &TokenConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        iat: now,
        exp: now.saturating_add(config.ttl_seconds()),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Check signature and expiry, returning the claims
pub fn verify_token(
    token: &str,
    config: &TokenConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}
