//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fincopilot_core::ScorePolicy;

/// FinCopilot - Track income and spending, get a financial health score
#[derive(Parser)]
#[command(name = "fincopilot")]
#[command(about = "Personal finance backend with AI insights", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "fincopilot.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set FINCOPILOT_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Parse a score policy name (baseline / weighted)
fn parse_policy(s: &str) -> Result<ScorePolicy, String> {
    s.parse()
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// Requests then name their user with the X-User-Id header.
        #[arg(long)]
        no_auth: bool,

        /// Default score policy (baseline or weighted; falls back to FINCOPILOT_SCORE_POLICY)
        #[arg(long, value_parser = parse_policy)]
        score_policy: Option<ScorePolicy>,
    },

    /// Manage users
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },

    /// Record or list income
    Income {
        #[command(subcommand)]
        action: IncomeAction,
    },

    /// Record or list expenses
    Expense {
        #[command(subcommand)]
        action: ExpenseAction,
    },

    /// Show a user's financial summary and score
    Summary {
        /// User ID
        #[arg(short, long)]
        user: i64,

        /// Score policy (baseline or weighted)
        #[arg(long, value_parser = parse_policy)]
        score_policy: Option<ScorePolicy>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stream AI advice for a user's summary to stdout
    Insight {
        /// User ID
        #[arg(short, long)]
        user: i64,

        /// Score policy (baseline or weighted)
        #[arg(long, value_parser = parse_policy)]
        score_policy: Option<ScorePolicy>,
    },

    /// Manage prompt templates
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum UsersAction {
    /// Register a user
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// List users
    List,
}

#[derive(Subcommand)]
pub enum IncomeAction {
    /// Record income
    Add {
        /// User ID
        #[arg(short, long)]
        user: i64,

        #[arg(short, long, allow_negative_numbers = true)]
        amount: f64,

        /// Where the money came from (e.g., Salary)
        #[arg(short, long)]
        source: String,

        /// Date received (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// List a user's income, newest first
    List {
        /// User ID
        #[arg(short, long)]
        user: i64,
    },
}

#[derive(Subcommand)]
pub enum ExpenseAction {
    /// Record an expense
    Add {
        /// User ID
        #[arg(short, long)]
        user: i64,

        #[arg(short, long, allow_negative_numbers = true)]
        amount: f64,

        /// Spending category (e.g., Rent, Groceries)
        #[arg(short, long)]
        category: String,

        /// Date spent (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// List a user's expenses, newest first
    List {
        /// User ID
        #[arg(short, long)]
        user: i64,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all available prompts and their override status
    List,

    /// Show the content of a specific prompt
    Show {
        /// Prompt ID (e.g., financial_insight)
        prompt_id: String,
    },

    /// Show the path where prompt overrides should be placed
    Path,
}
