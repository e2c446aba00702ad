//! General Discord commands - ping and help.
//! These commands don't touch the database.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**PharmaLink Help**\n\
        Carts are written as `drug_id:qty, drug_id:qty`.\n\n\
        **Ordering**\n\
        • `/order_drugs <items> [recipient] [notes]` - Institutes order from other institutes.\n\
        • `/order_from_institute <institute> <items> [notes]` - Pharmacies order from one institute (all or nothing).\n\
        • `/order_manufacturer <product> <manufacturer> <quantity> <unit_price> [notes]` - Record a manufacturer purchase.\n\n\
        **Browsing**\n\
        • `/my_orders [status] [type] [search] [page]` - Orders you placed.\n\
        • `/incoming_orders [status] [search] [page]` - Orders you sell into or receive.\n\
        • `/all_orders [status] [type] [search] [page]` - Every order (admins only).\n\
        • `/order_detail <order_id>` - One order with its items.\n\n\
        **Fulfilment**\n\
        • `/approve_item <item_id>` - Approve a pending item and commit its stock.\n\
        • `/reject_item <item_id>` - Reject an item; approved stock is returned.\n\
        • `/ship_item <item_id>` - Mark an approved item as shipped.\n\
        • `/restock_item <item_id>` - Move an out-of-stock item back to pending.\n\
        • `/edit_item_quantity <item_id> <quantity>` - Change a pending item's quantity.\n\n\
        **Utility**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
