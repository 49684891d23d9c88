//! Income and expense entries
//!
//! Entries are append-only: there is no update or delete.

use rusqlite::{params, Row};
use tracing::debug;

use super::{parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    EntryKind, ExpenseEntry, FinancialSummary, IncomeEntry, NewEntry, MAX_LEDGER_TOTAL,
};
use crate::summary::{LedgerTotals, ScorePolicy};

/// Columns shared by both entry tables, label column aliased
fn select_columns(kind: EntryKind) -> String {
    format!(
        "SELECT id, user_id, amount, {} AS label, date, created_at FROM {}",
        kind.label_column(),
        kind.table()
    )
}

struct EntryRow {
    id: i64,
    user_id: i64,
    amount: f64,
    label: String,
    date: Option<String>,
    created_at: String,
}

fn read_entry_row(row: &Row) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        amount: row.get(2)?,
        label: row.get(3)?,
        date: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl From<EntryRow> for IncomeEntry {
    fn from(r: EntryRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            amount: r.amount,
            source: r.label,
            date: parse_date(r.date),
            created_at: parse_datetime(&r.created_at),
        }
    }
}

impl From<EntryRow> for ExpenseEntry {
    fn from(r: EntryRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            amount: r.amount,
            category: r.label,
            date: parse_date(r.date),
            created_at: parse_datetime(&r.created_at),
        }
    }
}

impl Database {
    /// Record an entry of either kind, returning its ID
    ///
    /// The amount and label are validated, the owning user must exist, and
    /// the user's running total must stay within [`MAX_LEDGER_TOTAL`].
    pub fn insert_entry(&self, kind: EntryKind, user_id: i64, entry: &NewEntry) -> Result<i64> {
        entry.validate()?;
        self.require_user(user_id)?;

        let running = self.raw_sum(kind, user_id)?.unwrap_or(0.0) + entry.amount;
        if !running.is_finite() || running > MAX_LEDGER_TOTAL {
            return Err(Error::InvalidData(format!(
                "{} total for user {} would exceed {}",
                kind, user_id, MAX_LEDGER_TOTAL
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (user_id, amount, {}, date) VALUES (?, ?, ?, ?)",
                kind.table(),
                kind.label_column()
            ),
            params![
                user_id,
                entry.amount,
                entry.label.trim(),
                entry.date.map(|d| d.format("%Y-%m-%d").to_string())
            ],
        )?;
        let id = conn.last_insert_rowid();

        debug!(kind = %kind, user_id, id, amount = entry.amount, "Recorded entry");
        Ok(id)
    }

    /// Record an income entry
    pub fn add_income(&self, user_id: i64, entry: &NewEntry) -> Result<IncomeEntry> {
        let id = self.insert_entry(EntryKind::Income, user_id, entry)?;
        Ok(self.get_entry_row(EntryKind::Income, id)?.into())
    }

    /// Record an expense entry
    pub fn add_expense(&self, user_id: i64, entry: &NewEntry) -> Result<ExpenseEntry> {
        let id = self.insert_entry(EntryKind::Expense, user_id, entry)?;
        Ok(self.get_entry_row(EntryKind::Expense, id)?.into())
    }

    fn get_entry_row(&self, kind: EntryKind, id: i64) -> Result<EntryRow> {
        let conn = self.conn()?;
        let row = conn.query_row(
            &format!("{} WHERE id = ?", select_columns(kind)),
            params![id],
            read_entry_row,
        )?;
        Ok(row)
    }

    fn list_entry_rows(&self, kind: EntryKind, user_id: i64) -> Result<Vec<EntryRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE user_id = ? ORDER BY id DESC",
            select_columns(kind)
        ))?;

        let rows = stmt
            .query_map(params![user_id], read_entry_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// List a user's income entries, newest first
    pub fn list_income(&self, user_id: i64) -> Result<Vec<IncomeEntry>> {
        Ok(self
            .list_entry_rows(EntryKind::Income, user_id)?
            .into_iter()
            .map(IncomeEntry::from)
            .collect())
    }

    /// List a user's expense entries, newest first
    pub fn list_expenses(&self, user_id: i64) -> Result<Vec<ExpenseEntry>> {
        Ok(self
            .list_entry_rows(EntryKind::Expense, user_id)?
            .into_iter()
            .map(ExpenseEntry::from)
            .collect())
    }

    /// Raw sum of a user's entries of one kind; `None` when there are none
    fn raw_sum(&self, kind: EntryKind, user_id: i64) -> Result<Option<f64>> {
        let conn = self.conn()?;
        let sum: Option<f64> = conn.query_row(
            &format!("SELECT SUM(amount) FROM {} WHERE user_id = ?", kind.table()),
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(sum)
    }

    /// Sum of a user's entries of one kind (0 when there are none)
    pub fn sum_by_user(&self, kind: EntryKind, user_id: i64) -> Result<f64> {
        Ok(self.raw_sum(kind, user_id)?.unwrap_or(0.0))
    }

    /// Both totals for a user, normalized for the summary calculator
    pub fn ledger_totals(&self, user_id: i64) -> Result<LedgerTotals> {
        LedgerTotals::normalize(
            self.raw_sum(EntryKind::Income, user_id)?,
            self.raw_sum(EntryKind::Expense, user_id)?,
        )
    }

    /// Compute a user's summary from current ledger state
    pub fn summarize_user(&self, user_id: i64, policy: ScorePolicy) -> Result<FinancialSummary> {
        self.require_user(user_id)?;
        let totals = self.ledger_totals(user_id)?;
        Ok(totals.summarize(policy))
    }
}
