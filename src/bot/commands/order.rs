//! Order Discord commands - placing orders and browsing order history.
//!
//! Carts are typed as `drug_id:qty` pairs separated by commas. Listings render one
//! block per order with its visible items and a status summary.

use crate::{
    core::{
        format::{format_amount, format_quantity, format_status_badges, status_badge},
        history::{OrderPage, OrderView},
        order::{CartLine, PlacedOrder},
    },
    errors::{Error, Result},
};
use std::fmt::Write as _;

/// Parses `drug_id:qty, drug_id:qty` into cart lines.
///
/// # Errors
/// `InvalidItemsList` when the cart is empty or a pair is malformed.
pub fn parse_cart(input: &str) -> Result<Vec<CartLine>> {
    let lines = input
        .split([',', ';', '\n'])
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| -> Result<CartLine> {
            let malformed = || Error::InvalidItemsList {
                reason: format!("'{pair}' is not of the form drug_id:qty"),
            };
            let (drug_id, quantity) = pair.split_once([':', 'x', '*']).ok_or_else(malformed)?;
            let drug_id = drug_id.trim().parse().map_err(|_| malformed())?;
            let quantity = quantity.trim().parse().map_err(|_| malformed())?;
            Ok(CartLine::drug(drug_id, quantity))
        })
        .collect::<Result<Vec<_>>>()?;

    if lines.is_empty() {
        return Err(Error::InvalidItemsList {
            reason: "the cart is empty".to_string(),
        });
    }
    Ok(lines)
}

/// Confirmation for a freshly placed order.
///
/// # Errors
/// Returns an error if writing to the reply buffer fails.
pub fn render_placed(placed: &PlacedOrder) -> Result<String> {
    let mut text = String::new();
    writeln!(
        &mut text,
        "✅ Order **{}** placed (ID: {}), total {}",
        placed.order_number(),
        placed.order_id(),
        format_amount(placed.total_amount())
    )?;
    for item in &placed.items {
        let name = item
            .custom_name
            .clone()
            .or_else(|| item.drug_id.map(|id| format!("drug #{id}")))
            .unwrap_or_default();
        writeln!(
            &mut text,
            "{} item {}: {} × {} @ {} ({})",
            status_badge(item.status),
            item.id,
            format_quantity(item.quantity),
            name,
            format_amount(item.unit_price),
            item.status
        )?;
    }
    Ok(text)
}

/// One order block with its items.
///
/// # Errors
/// Returns an error if writing to the reply buffer fails.
pub fn render_order(view: &OrderView) -> Result<String> {
    let order = &view.order;
    let mut text = String::new();
    writeln!(
        &mut text,
        "**{}** (ID: {}) · {} · {}",
        order.order_number,
        order.id,
        order.transaction_type,
        order.created_at.format("%Y-%m-%d %H:%M")
    )?;
    write!(&mut text, "Buyer: {}", view.buyer_name)?;
    if let Some(recipient) = &view.recipient_name {
        write!(&mut text, " → {recipient}")?;
    }
    writeln!(
        &mut text,
        " · Total: {} · {}",
        format_amount(order.total_amount),
        format_status_badges(&view.counts)
    )?;
    if let Some(notes) = &order.notes {
        writeln!(&mut text, "📝 {notes}")?;
    }

    for item_view in &view.items {
        let item = &item_view.item;
        write!(
            &mut text,
            "  {} `#{}` {} × {} @ {}",
            status_badge(item.status),
            item.id,
            format_quantity(item.quantity),
            item_view.display_name,
            format_amount(item.unit_price)
        )?;
        if let Some(batch) = &item.batch_no {
            write!(&mut text, " · batch {batch}")?;
        }
        if let Some(seller) = &item_view.seller_name {
            write!(&mut text, " · from {seller}")?;
        }
        text.push('\n');
    }
    Ok(text)
}

/// A titled page of orders.
///
/// # Errors
/// Returns an error if writing to the reply buffer fails.
pub fn render_page(title: &str, page: &OrderPage) -> Result<String> {
    if page.orders.is_empty() {
        return Ok(format!("**{title}**\nNo orders found."));
    }
    let mut text = String::new();
    writeln!(
        &mut text,
        "**{title}** (page {}/{}, {} orders)\n",
        page.page,
        page.total_pages.max(1),
        page.total_orders
    )?;
    for view in &page.orders {
        writeln!(&mut text, "{}", render_order(view)?)?;
    }
    Ok(super::fit_message(text))
}

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use super::{parse_cart, render_order, render_page, render_placed};
    use crate::{
        bot::{
            BotData,
            commands::{reply_with, resolve_caller},
            handlers::autocomplete,
        },
        core::{
            history::{self, OrderFilter, PageRequest},
            order::{self, CartLine, NewOrder},
        },
        entities::{ItemStatus, TransactionType},
        errors::{Error, Result},
    };

    fn build_filter(
        status: Option<&str>,
        transaction_type: Option<&str>,
        search: Option<String>,
    ) -> Result<OrderFilter> {
        let mut filter = OrderFilter::default();
        if let Some(status) = status {
            filter = filter.with_status(status.parse::<ItemStatus>()?);
        }
        if let Some(transaction_type) = transaction_type {
            filter = filter.with_transaction_type(transaction_type.parse::<TransactionType>()?);
        }
        if let Some(search) = search {
            filter = filter.with_search(search);
        }
        Ok(filter)
    }

    fn page_request(page: Option<u32>) -> PageRequest {
        PageRequest::new(page.map_or(1, u64::from), history::DEFAULT_PAGE_SIZE)
    }

    async fn place(ctx: poise::Context<'_, BotData, Error>, new_order: NewOrder) -> Result<()> {
        let Some(actor) = resolve_caller(ctx).await? else {
            return Ok(());
        };
        let outcome = order::create_order(&ctx.data().database, actor, new_order).await;
        reply_with(ctx, outcome, |placed| render_placed(&placed)).await
    }

    /// Orders drugs from other institutes; each line goes to the drug's owner.
    #[poise::command(slash_command, prefix_command)]
    pub async fn order_drugs(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Cart as drug_id:qty, drug_id:qty"] items: String,
        #[description = "Optional institute the order is addressed to"] recipient: Option<i64>,
        #[description = "Optional notes for the sellers"] notes: Option<String>,
    ) -> Result<()> {
        let lines = match parse_cart(&items) {
            Ok(lines) => lines,
            Err(e) => {
                ctx.say(format!("❌ {e}")).await?;
                return Ok(());
            }
        };
        let mut new_order = NewOrder::new("institute", lines);
        new_order.recipient_id = recipient;
        new_order.notes = notes;
        place(ctx, new_order).await
    }

    /// Orders drugs from a single institute; rejected unless every line is in stock.
    #[poise::command(slash_command, prefix_command)]
    pub async fn order_from_institute(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Account ID of the supplying institute"] institute: i64,
        #[description = "Cart as drug_id:qty, drug_id:qty"] items: String,
        #[description = "Optional notes for the institute"] notes: Option<String>,
    ) -> Result<()> {
        let lines = match parse_cart(&items) {
            Ok(lines) => lines,
            Err(e) => {
                ctx.say(format!("❌ {e}")).await?;
                return Ok(());
            }
        };
        let mut new_order = NewOrder::new("pharmacy_to_institute", lines).with_recipient(institute);
        new_order.notes = notes;
        place(ctx, new_order).await
    }

    /// Records a purchase from an external manufacturer; approved immediately.
    #[poise::command(slash_command, prefix_command)]
    pub async fn order_manufacturer(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Product name"] product: String,
        #[description = "Manufacturer name"] manufacturer: String,
        #[description = "Units ordered"] quantity: i64,
        #[description = "Agreed price per unit"] unit_price: f64,
        #[description = "Optional notes"] notes: Option<String>,
    ) -> Result<()> {
        let line = CartLine::manufactured(product, manufacturer, quantity, unit_price);
        let mut new_order = NewOrder::new("manufacturer", vec![line]);
        new_order.notes = notes;
        place(ctx, new_order).await
    }

    /// Lists the orders you placed.
    #[poise::command(slash_command, prefix_command)]
    pub async fn my_orders(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only orders with an item in this status"]
        #[autocomplete = "autocomplete::autocomplete_status"]
        status: Option<String>,
        #[description = "Only orders of this type"]
        #[autocomplete = "autocomplete::autocomplete_transaction_type"]
        transaction_type: Option<String>,
        #[description = "Search order number, names, batch or manufacturer"]
        search: Option<String>,
        #[description = "Page number"] page: Option<u32>,
    ) -> Result<()> {
        let Some(actor) = resolve_caller(ctx).await? else {
            return Ok(());
        };
        let outcome = match build_filter(status.as_deref(), transaction_type.as_deref(), search) {
            Ok(filter) => {
                history::buyer_history(&ctx.data().database, actor, &filter, page_request(page))
                    .await
            }
            Err(e) => Err(e),
        };
        reply_with(ctx, outcome, |page| render_page("My orders", &page)).await
    }

    /// Lists orders you sell into or that are addressed to you.
    #[poise::command(slash_command, prefix_command)]
    pub async fn incoming_orders(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only orders with one of your items in this status"]
        #[autocomplete = "autocomplete::autocomplete_status"]
        status: Option<String>,
        #[description = "Search order number, names, batch or manufacturer"]
        search: Option<String>,
        #[description = "Page number"] page: Option<u32>,
    ) -> Result<()> {
        let Some(actor) = resolve_caller(ctx).await? else {
            return Ok(());
        };
        let outcome = match build_filter(status.as_deref(), None, search) {
            Ok(filter) => {
                history::seller_orders(&ctx.data().database, actor, &filter, page_request(page))
                    .await
            }
            Err(e) => Err(e),
        };
        reply_with(ctx, outcome, |page| render_page("Incoming orders", &page)).await
    }

    /// Lists every order on the platform (admins only).
    #[poise::command(slash_command, prefix_command)]
    pub async fn all_orders(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only orders with an item in this status"]
        #[autocomplete = "autocomplete::autocomplete_status"]
        status: Option<String>,
        #[description = "Only orders of this type"]
        #[autocomplete = "autocomplete::autocomplete_transaction_type"]
        transaction_type: Option<String>,
        #[description = "Search order number, names, batch or manufacturer"]
        search: Option<String>,
        #[description = "Page number"] page: Option<u32>,
    ) -> Result<()> {
        let Some(actor) = resolve_caller(ctx).await? else {
            return Ok(());
        };
        let outcome = match build_filter(status.as_deref(), transaction_type.as_deref(), search) {
            Ok(filter) => {
                history::admin_orders(&ctx.data().database, actor, &filter, page_request(page))
                    .await
            }
            Err(e) => Err(e),
        };
        reply_with(ctx, outcome, |page| render_page("All orders", &page)).await
    }

    /// Shows one order with its items.
    #[poise::command(slash_command, prefix_command)]
    pub async fn order_detail(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Order ID"] order_id: i64,
    ) -> Result<()> {
        let Some(actor) = resolve_caller(ctx).await? else {
            return Ok(());
        };
        let outcome = history::get_order_detail(&ctx.data().database, actor, order_id).await;
        reply_with(ctx, outcome, |view| {
            Ok(crate::bot::commands::fit_message(render_order(&view)?))
        })
        .await
    }
}

// Re-export all commands
pub use inner::*;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::history::{self, OrderFilter, PageRequest};
    use crate::core::order::{NewOrder, create_order};
    use crate::test_utils::*;

    #[test]
    fn test_parse_cart() {
        let lines = parse_cart("3:2, 7:10").unwrap();
        assert_eq!(lines, vec![CartLine::drug(3, 2), CartLine::drug(7, 10)]);

        let lines = parse_cart(" 3x2 ;\n 4 : 1 ,").unwrap();
        assert_eq!(lines, vec![CartLine::drug(3, 2), CartLine::drug(4, 1)]);
    }

    #[test]
    fn test_parse_cart_errors() {
        assert!(matches!(
            parse_cart("  "),
            Err(Error::InvalidItemsList { .. })
        ));
        assert!(matches!(
            parse_cart("3"),
            Err(Error::InvalidItemsList { .. })
        ));
        assert!(matches!(
            parse_cart("aspirin:2"),
            Err(Error::InvalidItemsList { .. })
        ));
        // Sign checks are left to order validation
        assert_eq!(parse_cart("3:-1").unwrap(), vec![CartLine::drug(3, -1)]);
    }

    #[tokio::test]
    async fn test_render_order_and_page() -> Result<()> {
        let m = setup_marketplace(5).await?;
        let placed = create_order(
            &m.db,
            m.buyer,
            NewOrder::new(
                "institute",
                vec![CartLine::drug(m.drug.id, 2), CartLine::drug(m.drug.id, 1200)],
            )
            .with_notes("ward 3"),
        )
        .await?;

        let confirmation = render_placed(&placed)?;
        assert!(confirmation.contains(placed.order_number()));
        assert!(confirmation.contains("$20.00"));
        assert!(confirmation.contains("out_of_stock"));

        let page =
            history::buyer_history(&m.db, m.buyer, &OrderFilter::default(), PageRequest::default())
                .await?;
        let text = render_page("My orders", &page)?;
        assert!(text.contains("page 1/1, 1 orders"));
        assert!(text.contains("Amoxicillin"));
        assert!(text.contains("1,200"));
        assert!(text.contains("batch AMX-001"));
        assert!(text.contains("from City Clinic"));
        assert!(text.contains("📝 ward 3"));
        assert!(text.contains("⏳ 1 pending · ⚠️ 1 out of stock"));

        let empty =
            history::buyer_history(&m.db, m.seller, &OrderFilter::default(), PageRequest::default())
                .await?;
        assert_eq!(render_page("My orders", &empty)?, "**My orders**\nNo orders found.");
        Ok(())
    }
}
