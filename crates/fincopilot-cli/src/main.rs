//! FinCopilot CLI - Personal finance backend with AI insights
//!
//! Usage:
//!   fincopilot init                          Initialize database
//!   fincopilot users add --name .. --email ..  Register a user
//!   fincopilot income add --user 1 --amount .. Record income
//!   fincopilot summary --user 1              Show totals and score
//!   fincopilot serve --port 8000             Start the API server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
            score_policy,
        } => {
            commands::cmd_serve(&cli.db, &host, port, no_auth, cli.no_encrypt, score_policy).await
        }
        Commands::Users { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                UsersAction::Add {
                    name,
                    email,
                    password,
                } => commands::cmd_users_add(&db, &name, &email, &password).map(|_| ()),
                UsersAction::List => commands::cmd_users_list(&db),
            }
        }
        Commands::Income { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                IncomeAction::Add {
                    user,
                    amount,
                    source,
                    date,
                } => commands::cmd_income_add(&db, user, amount, &source, date).map(|_| ()),
                IncomeAction::List { user } => commands::cmd_income_list(&db, user),
            }
        }
        Commands::Expense { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                ExpenseAction::Add {
                    user,
                    amount,
                    category,
                    date,
                } => commands::cmd_expense_add(&db, user, amount, &category, date).map(|_| ()),
                ExpenseAction::List { user } => commands::cmd_expense_list(&db, user),
            }
        }
        Commands::Summary {
            user,
            score_policy,
            json,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_summary(&db, user, score_policy, json).map(|_| ())
        }
        Commands::Insight { user, score_policy } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_insight(&db, user, score_policy).await
        }
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { prompt_id }) => commands::cmd_prompts_show(&prompt_id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
    }
}
