//! Server command implementation

use std::path::Path;

use anyhow::Result;
use fincopilot_core::summary::ScorePolicy;
use fincopilot_server::tokens::{TokenConfig, JWT_SECRET_ENV};
use fincopilot_server::{parse_allowed_origins, ServerConfig, ALLOWED_ORIGINS_ENV};

use super::open_db;

/// Build the server configuration from flags and environment
pub fn server_config(no_auth: bool, score_policy: Option<ScorePolicy>) -> ServerConfig {
    let origins = std::env::var(ALLOWED_ORIGINS_ENV).unwrap_or_default();

    ServerConfig {
        require_auth: !no_auth,
        allowed_origins: parse_allowed_origins(&origins),
        tokens: TokenConfig::from_env(),
        score_policy: score_policy.unwrap_or_else(ScorePolicy::from_env),
    }
}

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
    score_policy: Option<ScorePolicy>,
) -> Result<()> {
    let config = server_config(no_auth, score_policy);

    println!("🚀 Starting FinCopilot API server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    println!("   Score policy: {}", config.score_policy.as_str());

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
        println!("      Requests select their user with the X-User-Id header");
    } else if config.tokens.is_configured() {
        println!(
            "   🔒 Authentication: bearer tokens ({} min lifetime)",
            config.tokens.ttl_minutes
        );
    } else {
        println!("   ⚠️  {} is not set; the server will refuse to start", JWT_SECRET_ENV);
    }
    if !config.allowed_origins.is_empty() {
        println!(
            "   🌐 Allowed origins: {} ({})",
            config.allowed_origins.join(", "),
            ALLOWED_ORIGINS_ENV
        );
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    fincopilot_server::serve_with_config(db, host, port, config).await?;

    Ok(())
}
