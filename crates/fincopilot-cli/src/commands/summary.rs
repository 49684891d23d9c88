//! Financial summary and streamed insight commands

use std::io::Write;

use anyhow::{Context, Result};
use fincopilot_core::ai::AIClient;
use fincopilot_core::db::Database;
use fincopilot_core::insight::InsightGenerator;
use fincopilot_core::models::FinancialSummary;
use fincopilot_core::money::format_rupees;
use fincopilot_core::prompts::PromptLibrary;
use fincopilot_core::summary::ScorePolicy;
use futures::StreamExt;

use super::ledger::CLI_ACTOR;

/// Print a user's summary as a table, or as JSON with `--json`
pub fn cmd_summary(
    db: &Database,
    user_id: i64,
    policy: Option<ScorePolicy>,
    json: bool,
) -> Result<FinancialSummary> {
    let user = db.require_user(user_id)?;
    let policy = policy.unwrap_or_else(ScorePolicy::from_env);
    let summary = db.summarize_user(user_id, policy)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(summary);
    }

    println!();
    println!("📊 Financial Summary for {}", user.name);
    println!("   ─────────────────────────────");
    println!("   Income:   {:>16}", format_rupees(summary.total_income));
    println!("   Expenses: {:>16}", format_rupees(summary.total_expense));
    println!("   Savings:  {:>16}", format_rupees(summary.savings));
    println!("   Saved:    {:>15.2}%", summary.savings_percent);
    println!();
    println!(
        "   Score: {}/100 ({} policy)",
        summary.financial_score,
        policy.as_str()
    );
    println!();

    Ok(summary)
}

/// Stream AI advice for a user's summary to stdout
pub async fn cmd_insight(db: &Database, user_id: i64, policy: Option<ScorePolicy>) -> Result<()> {
    let Some(ai) = AIClient::from_env() else {
        anyhow::bail!(
            "No AI backend configured. Set GROQ_API_KEY (or AI_BACKEND=openai_compatible with \
            OPENAI_COMPATIBLE_HOST) to enable insights."
        );
    };

    let mut prompts = PromptLibrary::new();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    stream_insight(db, ai, &mut prompts, user_id, policy, &mut out).await?;
    writeln!(out)?;

    Ok(())
}

/// Generate an insight with the given backend, writing chunks as they arrive
pub async fn stream_insight<W: Write>(
    db: &Database,
    ai: AIClient,
    prompts: &mut PromptLibrary,
    user_id: i64,
    policy: Option<ScorePolicy>,
    out: &mut W,
) -> Result<()> {
    db.require_user(user_id)?;
    let policy = policy.unwrap_or_else(ScorePolicy::from_env);
    let summary = db.summarize_user(user_id, policy)?;

    let generator = InsightGenerator::from_library(ai, prompts)
        .context("Failed to load insight prompt")?;

    let mut stream = generator.generate_insight(&summary).await?;
    while let Some(chunk) = stream.next().await {
        let text = chunk?;
        out.write_all(text.as_bytes())?;
        out.flush()?;
    }

    db.log_audit(
        CLI_ACTOR,
        "stream",
        Some("insight"),
        Some(user_id),
        Some(&format!("score={}", summary.financial_score)),
    )?;

    Ok(())
}
