//! Item workflow Discord commands - approve, reject, ship, restock and quantity edits.

use crate::{
    core::{
        format::{format_quantity, status_badge},
        item::ItemTransition,
    },
    entities::order_item,
};

/// Reply for a completed status change.
#[must_use]
pub fn render_transition(transition: &ItemTransition) -> String {
    let item = &transition.item;
    let mut text = format!(
        "{} Item {} moved from {} to {}",
        status_badge(item.status),
        item.id,
        transition.previous,
        item.status
    );
    if let Some(stock) = transition.stock {
        text.push_str(&format!(" · stock now {}", format_quantity(stock)));
    }
    text
}

/// Reply for a quantity edit.
#[must_use]
pub fn render_quantity_edit(item: &order_item::Model) -> String {
    format!(
        "✅ Item {} now requests {} units",
        item.id,
        format_quantity(item.quantity)
    )
}

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use super::{render_quantity_edit, render_transition};
    use crate::{
        bot::{
            BotData,
            commands::{reply_with, resolve_caller},
        },
        core::item,
        entities::ItemStatus,
        errors::{Error, Result},
    };

    async fn transition(
        ctx: poise::Context<'_, BotData, Error>,
        item_id: i64,
        target: ItemStatus,
    ) -> Result<()> {
        let Some(actor) = resolve_caller(ctx).await? else {
            return Ok(());
        };
        let outcome = item::transition_item(&ctx.data().database, actor, item_id, target).await;
        reply_with(ctx, outcome, |done| Ok(render_transition(&done))).await
    }

    /// Approves a pending item and commits its stock.
    #[poise::command(slash_command, prefix_command)]
    pub async fn approve_item(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Order item ID"] item_id: i64,
    ) -> Result<()> {
        transition(ctx, item_id, ItemStatus::Approved).await
    }

    /// Rejects an item; stock of an approved item is returned.
    #[poise::command(slash_command, prefix_command)]
    pub async fn reject_item(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Order item ID"] item_id: i64,
    ) -> Result<()> {
        transition(ctx, item_id, ItemStatus::Rejected).await
    }

    /// Marks an approved item as shipped.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ship_item(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Order item ID"] item_id: i64,
    ) -> Result<()> {
        transition(ctx, item_id, ItemStatus::Shipped).await
    }

    /// Moves an out-of-stock item back to pending once stock covers it.
    #[poise::command(slash_command, prefix_command)]
    pub async fn restock_item(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Order item ID"] item_id: i64,
    ) -> Result<()> {
        transition(ctx, item_id, ItemStatus::Pending).await
    }

    /// Changes the quantity of a pending item.
    #[poise::command(slash_command, prefix_command)]
    pub async fn edit_item_quantity(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Order item ID"] item_id: i64,
        #[description = "New quantity"] quantity: i64,
    ) -> Result<()> {
        let Some(actor) = resolve_caller(ctx).await? else {
            return Ok(());
        };
        let outcome =
            item::edit_item_quantity(&ctx.data().database, actor, item_id, quantity).await;
        reply_with(ctx, outcome, |edited| Ok(render_quantity_edit(&edited))).await
    }
}

// Re-export all commands
pub use inner::*;
