//! Domain models for FinCopilot

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string. Never leaves the process.
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Data for registering a user (password already hashed)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// The two kinds of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Income,
    Expense,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Table holding entries of this kind
    pub(crate) fn table(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expenses",
        }
    }

    /// Column holding the free-text label (income source / expense category)
    pub(crate) fn label_column(&self) -> &'static str {
        match self {
            Self::Income => "source",
            Self::Expense => "category",
        }
    }
}

impl std::str::FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" | "incomes" => Ok(Self::Income),
            "expense" | "expenses" => Ok(Self::Expense),
            _ => Err(format!("Unknown entry kind: {}", s)),
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recorded income entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeEntry {
    pub id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub source: String,
    pub date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// A recorded expense entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseEntry {
    pub id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub category: String,
    pub date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Largest single entry the ledger accepts (₹1 lakh crore)
pub const MAX_ENTRY_AMOUNT: f64 = 1e12;

/// Largest per-user, per-kind total the ledger accepts
pub const MAX_LEDGER_TOTAL: f64 = 1e15;

/// Data for recording a ledger entry of either kind
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub amount: f64,
    /// Income source or expense category
    pub label: String,
    pub date: Option<NaiveDate>,
}

impl NewEntry {
    pub fn new(amount: f64, label: &str, date: Option<NaiveDate>) -> Self {
        Self {
            amount,
            label: label.to_string(),
            date,
        }
    }

    /// Reject amounts and labels the ledger must never hold
    pub fn validate(&self) -> crate::Result<()> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(crate::Error::InvalidData(format!(
                "Amount must be a non-negative number, got {}",
                self.amount
            )));
        }
        if self.amount > MAX_ENTRY_AMOUNT {
            return Err(crate::Error::InvalidData(format!(
                "Amount must not exceed {}, got {}",
                MAX_ENTRY_AMOUNT, self.amount
            )));
        }
        if self.label.trim().is_empty() {
            return Err(crate::Error::InvalidData("Label must not be empty".into()));
        }
        Ok(())
    }
}

/// Read-time projection of a user's totals. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub total_income: f64,
    pub total_expense: f64,
    /// May be negative (deficit)
    pub savings: f64,
    /// Rounded to 2 decimals; 0 when there is no income
    pub savings_percent: f64,
    /// Always within 0..=100
    pub financial_score: u8,
}

/// Audit log entry
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub actor: String,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_kind_parse() {
        assert_eq!("income".parse::<EntryKind>().unwrap(), EntryKind::Income);
        assert_eq!("Expenses".parse::<EntryKind>().unwrap(), EntryKind::Expense);
        assert!("savings".parse::<EntryKind>().is_err());
    }

    #[test]
    fn test_new_entry_validation() {
        assert!(NewEntry::new(10.0, "Salary", None).validate().is_ok());
        assert!(NewEntry::new(0.0, "Gift", None).validate().is_ok());
        assert!(NewEntry::new(-1.0, "Food", None).validate().is_err());
        assert!(NewEntry::new(f64::NAN, "Food", None).validate().is_err());
        assert!(NewEntry::new(f64::INFINITY, "Food", None).validate().is_err());
        assert!(NewEntry::new(5.0, "   ", None).validate().is_err());
        assert!(NewEntry::new(MAX_ENTRY_AMOUNT, "Sale", None).validate().is_ok());
        assert!(NewEntry::new(MAX_ENTRY_AMOUNT * 2.0, "Sale", None)
            .validate()
            .is_err());
        assert!(NewEntry::new(1e308, "Sale", None).validate().is_err());
    }

    #[test]
    fn test_user_hash_not_serialized() {
        let user = User {
            id: 1,
            name: "asha".into(),
            email: "asha@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "asha@example.com");
    }
}
