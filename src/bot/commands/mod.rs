//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// General utility commands
pub mod general;

/// Item approval workflow commands
pub mod item;

/// Order placement and listing commands
pub mod order;

// Export commands
pub use general::*;
pub use item::*;
pub use order::*;

use crate::{
    bot::BotData,
    core::account::{self, Actor},
    errors::{Error, Result},
};

/// Resolves the command author to a PharmaLink account.
///
/// Replies with a hint and returns `None` when the Discord user is not linked to any
/// account.
pub async fn resolve_caller(ctx: poise::Context<'_, BotData, Error>) -> Result<Option<Actor>> {
    let discord_id = ctx.author().id.to_string();
    match account::resolve_discord_actor(&ctx.data().database, &discord_id).await {
        Ok(actor) => Ok(Some(actor)),
        Err(Error::AccountNotFound { .. }) => {
            ctx.say("❌ Your Discord account is not linked to a PharmaLink account. Ask an admin to add your Discord ID.")
                .await?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Sends the outcome of a core operation.
///
/// Errors the caller can act on are shown to them; storage and internal errors are
/// returned to the framework error handler.
pub async fn reply_with<T>(
    ctx: poise::Context<'_, BotData, Error>,
    outcome: Result<T>,
    render: impl FnOnce(T) -> Result<String>,
) -> Result<()> {
    match outcome {
        Ok(value) => {
            ctx.say(render(value)?).await?;
            Ok(())
        }
        Err(e) if e.is_user_facing() => {
            ctx.say(format!("❌ {e}")).await?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Truncates a reply to Discord's message limit.
#[must_use]
pub fn fit_message(mut text: String) -> String {
    const LIMIT: usize = 1900;
    if text.len() > LIMIT {
        let mut cut = LIMIT;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("\n… (truncated, use a narrower filter or another page)");
    }
    text
}
