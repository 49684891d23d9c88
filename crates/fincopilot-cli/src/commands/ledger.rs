//! User, income and expense command implementations

use anyhow::{Context, Result};
use chrono::NaiveDate;
use fincopilot_core::credentials::hash_password;
use fincopilot_core::db::Database;
use fincopilot_core::models::{NewEntry, NewUser};
use fincopilot_core::money::format_rupees;

use super::truncate;

/// Actor recorded in the audit log for CLI changes
pub const CLI_ACTOR: &str = "cli";

/// Entries without a date show a dash
fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn cmd_users_add(db: &Database, name: &str, email: &str, password: &str) -> Result<i64> {
    let password_hash = hash_password(password)?;
    let user = db
        .create_user(&NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
        })
        .context("Failed to create user")?;

    db.log_audit(CLI_ACTOR, "register", Some("user"), Some(user.id), None)?;

    println!("✅ Created user {} ({}) with ID {}", user.name, user.email, user.id);
    Ok(user.id)
}

pub fn cmd_users_list(db: &Database) -> Result<()> {
    let users = db.list_users()?;

    if users.is_empty() {
        println!("No users found. Add one with 'fincopilot users add'.");
        return Ok(());
    }

    println!();
    println!("👤 Users ({})", users.len());
    println!("   ─────────────────────────────────────────────────────────────");
    for user in users {
        println!(
            "   {:>4}  {:<24} {:<32} {}",
            user.id,
            truncate(&user.name, 24),
            truncate(&user.email, 32),
            user.created_at.format("%Y-%m-%d")
        );
    }
    println!();

    Ok(())
}

pub fn cmd_income_add(
    db: &Database,
    user_id: i64,
    amount: f64,
    source: &str,
    date: Option<NaiveDate>,
) -> Result<i64> {
    db.require_user(user_id)?;
    let income = db.add_income(user_id, &NewEntry::new(amount, source, date))?;
    db.log_audit(
        CLI_ACTOR,
        "create",
        Some("income"),
        Some(income.id),
        Some(&format!("user={} amount={}", user_id, income.amount)),
    )?;

    println!(
        "✅ Recorded income {} from {} on {}",
        format_rupees(income.amount),
        income.source,
        format_date(income.date)
    );
    Ok(income.id)
}

pub fn cmd_income_list(db: &Database, user_id: i64) -> Result<()> {
    db.require_user(user_id)?;
    let entries = db.list_income(user_id)?;

    if entries.is_empty() {
        println!("No income recorded for user {}.", user_id);
        return Ok(());
    }

    println!();
    println!("💰 Income for user {}", user_id);
    println!("   ─────────────────────────────────────────────");
    for entry in &entries {
        println!(
            "   {:<10}  {:<24} {:>16}",
            format_date(entry.date),
            truncate(&entry.source, 24),
            format_rupees(entry.amount)
        );
    }
    println!("   ─────────────────────────────────────────────");
    println!(
        "   Total: {}",
        format_rupees(entries.iter().map(|e| e.amount).sum())
    );
    println!();

    Ok(())
}

pub fn cmd_expense_add(
    db: &Database,
    user_id: i64,
    amount: f64,
    category: &str,
    date: Option<NaiveDate>,
) -> Result<i64> {
    db.require_user(user_id)?;
    let expense = db.add_expense(user_id, &NewEntry::new(amount, category, date))?;
    db.log_audit(
        CLI_ACTOR,
        "create",
        Some("expense"),
        Some(expense.id),
        Some(&format!("user={} amount={}", user_id, expense.amount)),
    )?;

    println!(
        "✅ Recorded expense {} for {} on {}",
        format_rupees(expense.amount),
        expense.category,
        format_date(expense.date)
    );
    Ok(expense.id)
}

pub fn cmd_expense_list(db: &Database, user_id: i64) -> Result<()> {
    db.require_user(user_id)?;
    let entries = db.list_expenses(user_id)?;

    if entries.is_empty() {
        println!("No expenses recorded for user {}.", user_id);
        return Ok(());
    }

    println!();
    println!("🧾 Expenses for user {}", user_id);
    println!("   ─────────────────────────────────────────────");
    for entry in &entries {
        println!(
            "   {:<10}  {:<24} {:>16}",
            format_date(entry.date),
            truncate(&entry.category, 24),
            format_rupees(entry.amount)
        );
    }
    println!("   ─────────────────────────────────────────────");
    println!(
        "   Total: {}",
        format_rupees(entries.iter().map(|e| e.amount).sum())
    );
    println!();

    Ok(())
}
