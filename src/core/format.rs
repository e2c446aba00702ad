//! Display helpers shared by the chat front end.

use crate::{core::history::StatusCounts, entities::ItemStatus};

/// Groups the digits of a non-negative integer string with commas.
fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Formats a money amount as `$1,234.50`; negatives as `-$12.00`.
#[must_use]
pub fn format_amount(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    format!("{sign}${}.{cents}", group_thousands(whole))
}

/// Formats a unit count as `1,200`.
#[must_use]
pub fn format_quantity(quantity: i64) -> String {
    let grouped = group_thousands(&quantity.unsigned_abs().to_string());
    if quantity < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Short emoji badge for a status.
#[must_use]
pub const fn status_badge(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Pending => "⏳",
        ItemStatus::Approved => "✅",
        ItemStatus::Rejected => "❌",
        ItemStatus::Shipped => "📦",
        ItemStatus::OutOfStock => "⚠️",
    }
}

/// One-line summary of non-zero status buckets, e.g. `⏳ 2 pending · ✅ 1 approved`.
#[must_use]
pub fn format_status_badges(counts: &StatusCounts) -> String {
    let parts: Vec<String> = ItemStatus::ALL
        .iter()
        .filter(|status| counts.get(**status) > 0)
        .map(|status| {
            format!(
                "{} {} {}",
                status_badge(*status),
                counts.get(*status),
                status.as_str().replace('_', " ")
            )
        })
        .collect();

    if parts.is_empty() {
        "no items".to_string()
    } else {
        parts.join(" · ")
    }
}
