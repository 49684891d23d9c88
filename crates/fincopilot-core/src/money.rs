//! Rupee formatting
//!
//! Amounts are shown with the ₹ symbol and Indian digit grouping
//! (last three digits, then groups of two): `₹12,34,567.89`.

pub const RUPEE: char = '₹';

/// Format an amount as rupees with two decimals
pub fn format_rupees(amount: f64) -> String {
    let negative = amount < 0.0;
    let fixed = format!("{:.2}", amount.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let grouped = group_indian(whole);
    if negative && fixed != "0.00" {
        format!("-{}{}.{}", RUPEE, grouped, fraction)
    } else {
        format!("{}{}.{}", RUPEE, grouped, fraction)
    }
}

/// Insert separators into a string of ASCII digits
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}
