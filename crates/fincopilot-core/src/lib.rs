//! FinCopilot Core Library
//!
//! Shared functionality for the FinCopilot personal finance backend:
//! - Ledger store (users, income, expenses) with connection pooling
//! - Summary calculator and financial health score
//! - Streaming insight generation over OpenAI-compatible backends (Groq)
//! - Prompt library with user overrides
//! - Password hashing and rupee formatting

pub mod ai;
pub mod credentials;
pub mod db;
pub mod error;
pub mod insight;
pub mod models;
pub mod money;
pub mod prompts;
pub mod summary;

/// Test utilities including mock chat-completions server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIClient, ChatPrompt, InsightBackend, MockBackend, OpenAICompatibleBackend, TextStream};
pub use db::Database;
pub use error::{Error, Result};
pub use insight::InsightGenerator;
pub use models::{
    AuditEntry, EntryKind, ExpenseEntry, FinancialSummary, IncomeEntry, NewEntry, NewUser, User,
};
pub use money::format_rupees;
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use summary::{compute_summary, score, LedgerTotals, ScorePolicy};
