//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggests item statuses and transaction types as the user types, so the string
//! parameters parse on the first try.

use crate::{
    bot::BotData,
    entities::{ItemStatus, TransactionType},
    errors::Error,
};
use sea_orm::Iterable;

/// Discord autocomplete limit
const MAX_SUGGESTIONS: usize = 25;

fn matching<'a>(candidates: impl Iterator<Item = &'a str>, partial: &str) -> Vec<String> {
    let partial_lower = partial.trim().to_lowercase();
    candidates
        .filter(|name| name.contains(&partial_lower))
        .map(str::to_string)
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Suggests item statuses matching the partial input, in triage order.
pub async fn autocomplete_status(
    _ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    matching(ItemStatus::ALL.iter().map(|status| status.as_str()), partial)
}

/// Suggests transaction types matching the partial input.
pub async fn autocomplete_transaction_type(
    _ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let names: Vec<&str> = TransactionType::iter().map(TransactionType::as_str).collect();
    matching(names.into_iter(), partial)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_filters_case_insensitively() {
        let statuses = ItemStatus::ALL.iter().map(|status| status.as_str());
        assert_eq!(matching(statuses, "P"), vec!["pending", "approved", "shipped"]);

        let statuses = ItemStatus::ALL.iter().map(|status| status.as_str());
        assert_eq!(matching(statuses, "").len(), ItemStatus::ALL.len());

        let types = ["institute", "manufacturer", "pharmacy_to_institute"].into_iter();
        assert_eq!(matching(types, "INST"), vec!["institute", "pharmacy_to_institute"]);
    }
}
