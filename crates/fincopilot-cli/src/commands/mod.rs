//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Database initialization and shared utilities (open_db)
//! - `ledger` - Users, income and expense commands
//! - `prompts` - Prompt library management commands
//! - `serve` - Web server command
//! - `summary` - Financial summary and streamed insight commands

pub mod core;
pub mod ledger;
pub mod prompts;
pub mod serve;
pub mod summary;

// Re-export command functions for main.rs
pub use core::*;
pub use ledger::*;
pub use prompts::*;
pub use serve::*;
pub use summary::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
