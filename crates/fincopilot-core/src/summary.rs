//! Financial summary and score computation
//!
//! Turns a user's income/expense totals into a [`FinancialSummary`]. Everything
//! here is pure: the same totals and policy always produce the same summary.
//!
//! Two scoring tables exist and are not interchangeable, so the caller picks one
//! explicitly through [`ScorePolicy`]:
//!
//! | Policy     | Savings tier                                   | Other components                         |
//! |------------|------------------------------------------------|------------------------------------------|
//! | `Baseline` | 50 + (≥30 → 30, ≥20 → 20, ≥10 → 10)            | −20 when expense > income, clamp 0..=100 |
//! | `Weighted` | ≥40 → 50, ≥25 → 40, ≥15 → 30, ≥5 → 20, else 10 | +30 expense < income (else +5), +20 income > 0 |

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::FinancialSummary;

/// Environment variable selecting the default score policy
pub const SCORE_POLICY_ENV: &str = "FINCOPILOT_SCORE_POLICY";

/// Which scoring table to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorePolicy {
    /// Start at 50, add a savings-tier bonus, subtract an overspend penalty
    #[default]
    Baseline,
    /// Three additive components on a 100-point budget
    Weighted,
}

impl ScorePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Weighted => "weighted",
        }
    }

    pub fn all() -> &'static [ScorePolicy] {
        &[Self::Baseline, Self::Weighted]
    }

    /// Read `FINCOPILOT_SCORE_POLICY`, falling back to the default
    pub fn from_env() -> Self {
        match std::env::var(SCORE_POLICY_ENV) {
            Ok(value) => value.parse().unwrap_or_else(|e: String| {
                tracing::warn!(value = %value, error = %e, "Ignoring unknown score policy");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }
}

impl std::str::FromStr for ScorePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baseline" | "a" => Ok(Self::Baseline),
            "weighted" | "b" => Ok(Self::Weighted),
            _ => Err(format!(
                "Unknown score policy: {} (expected baseline or weighted)",
                s
            )),
        }
    }
}

impl std::fmt::Display for ScorePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Income and expense totals that are safe to feed into [`compute_summary`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LedgerTotals {
    pub income: f64,
    pub expense: f64,
}

impl LedgerTotals {
    /// Normalize raw totals at the boundary
    ///
    /// A missing total means "no entries" and becomes 0. Negative or
    /// non-finite totals are rejected rather than passed through.
    pub fn normalize(income: Option<f64>, expense: Option<f64>) -> Result<Self> {
        Ok(Self {
            income: normalize_total("income", income)?,
            expense: normalize_total("expense", expense)?,
        })
    }

    /// Summarize these totals under the given policy
    pub fn summarize(&self, policy: ScorePolicy) -> FinancialSummary {
        compute_summary(self.income, self.expense, policy)
    }
}

fn normalize_total(name: &str, value: Option<f64>) -> Result<f64> {
    match value {
        None => Ok(0.0),
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
        Some(v) => Err(Error::InvalidData(format!(
            "Total {} must be a non-negative number, got {}",
            name, v
        ))),
    }
}

/// Build a summary from non-negative totals
pub fn compute_summary(
    total_income: f64,
    total_expense: f64,
    policy: ScorePolicy,
) -> FinancialSummary {
    let savings = total_income - total_expense;
    let savings_percent = if total_income == 0.0 {
        0.0
    } else {
        // A tiny income against a large expense can overflow to -inf
        round2((savings / total_income * 100.0).clamp(f64::MIN, f64::MAX))
    };

    let mut summary = FinancialSummary {
        total_income,
        total_expense,
        savings,
        savings_percent,
        financial_score: 0,
    };
    summary.financial_score = score(&summary, policy);
    summary
}

/// Score a summary under the given policy. Always within 0..=100.
pub fn score(summary: &FinancialSummary, policy: ScorePolicy) -> u8 {
    let raw = match policy {
        ScorePolicy::Baseline => baseline_score(summary),
        ScorePolicy::Weighted => weighted_score(summary),
    };
    raw.clamp(0, 100) as u8
}

fn baseline_score(summary: &FinancialSummary) -> i32 {
    let pct = summary.savings_percent;
    let mut score = 50;

    score += if pct >= 30.0 {
        30
    } else if pct >= 20.0 {
        20
    } else if pct >= 10.0 {
        10
    } else {
        0
    };

    if summary.total_expense > summary.total_income {
        score -= 20;
    }

    score
}

fn weighted_score(summary: &FinancialSummary) -> i32 {
    let pct = summary.savings_percent;

    let savings_tier = if pct >= 40.0 {
        50
    } else if pct >= 25.0 {
        40
    } else if pct >= 15.0 {
        30
    } else if pct >= 5.0 {
        20
    } else {
        10
    };

    let expense_control = if summary.total_expense < summary.total_income {
        30
    } else {
        5
    };

    let income_existence = if summary.total_income > 0.0 { 20 } else { 0 };

    savings_tier + expense_control + income_existence
}

/// Round to 2 decimals, half away from zero
fn round2(value: f64) -> f64 {
    // Beyond this, f64 carries no fractional digits and scaling could overflow
    if value.abs() >= 1e15 {
        return value;
    }
    (value * 100.0).round() / 100.0
}
