//! Order query and history service.
//!
//! Read-only, role-scoped views over orders. Filtering, search and pagination run in
//! the database; the page of orders is then expanded with its items and the names a
//! reader needs (buyer, recipient, seller, drug).
//!
//! Visibility rules:
//! - a buyer sees their own orders with every item
//! - a seller sees orders where they sell at least one item, restricted to their own
//!   items, plus orders addressed to them as recipient with every item
//! - an admin sees everything

use crate::{
    core::{account::Actor, repository},
    entities::{
        Account, Drug, ItemStatus, Order, OrderItem, Role, TransactionType, account, drug, order,
        order_item,
    },
    errors::{Error, Result},
};
use sea_orm::{
    Condition, PaginatorTrait, QueryOrder,
    prelude::*,
    sea_query::{IntoCondition, LikeExpr, Query, SelectStatement},
};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Default number of orders per page.
pub const DEFAULT_PAGE_SIZE: u64 = 20;
/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Optional narrowing of an order listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Keep orders with at least one visible item in this status
    pub status: Option<ItemStatus>,
    /// Keep orders of this channel
    pub transaction_type: Option<TransactionType>,
    /// Case-insensitive substring over order number, names, batch and manufacturer
    pub search: Option<String>,
}

impl OrderFilter {
    /// Filters on item status.
    #[must_use]
    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filters on transaction type.
    #[must_use]
    pub fn with_transaction_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    /// Adds a free-text search.
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page number, starting at 1
    pub page: u64,
    /// Orders per page
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Creates a page request, clamping out-of-range values.
    #[must_use]
    pub fn new(page: u64, limit: u64) -> Self {
        Self { page, limit }.normalized()
    }

    /// Page at least 1, limit within `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

/// An item with the names needed to display it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    /// The stored item
    pub item: order_item::Model,
    /// Drug name for peer items
    pub drug_name: Option<String>,
    /// Seller account name, or the manufacturer for manufacturer items
    pub seller_name: Option<String>,
    /// Drug name, custom name, or a placeholder
    pub display_name: String,
}

/// Number of items per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// Items waiting for the seller
    pub pending_items: usize,
    /// Approved items
    pub approved_items: usize,
    /// Rejected items
    pub rejected_items: usize,
    /// Shipped items
    pub shipped_items: usize,
    /// Items that were out of stock at creation and not yet recovered
    pub out_of_stock_items: usize,
}

impl StatusCounts {
    /// Tallies statuses.
    pub fn tally(statuses: impl IntoIterator<Item = ItemStatus>) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            match status {
                ItemStatus::Pending => counts.pending_items += 1,
                ItemStatus::Approved => counts.approved_items += 1,
                ItemStatus::Rejected => counts.rejected_items += 1,
                ItemStatus::Shipped => counts.shipped_items += 1,
                ItemStatus::OutOfStock => counts.out_of_stock_items += 1,
            }
        }
        counts
    }

    /// Count for one status.
    #[must_use]
    pub const fn get(&self, status: ItemStatus) -> usize {
        match status {
            ItemStatus::Pending => self.pending_items,
            ItemStatus::Approved => self.approved_items,
            ItemStatus::Rejected => self.rejected_items,
            ItemStatus::Shipped => self.shipped_items,
            ItemStatus::OutOfStock => self.out_of_stock_items,
        }
    }

    /// Sum over all statuses.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.pending_items
            + self.approved_items
            + self.rejected_items
            + self.shipped_items
            + self.out_of_stock_items
    }
}

/// The status an order shows as a whole: the highest-priority status among its items.
#[must_use]
pub fn overall_status(statuses: impl IntoIterator<Item = ItemStatus>) -> Option<ItemStatus> {
    statuses.into_iter().min_by_key(|status| status.priority())
}

/// An order with its visible items and derived summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderView {
    /// The stored header
    pub order: order::Model,
    /// Name of the buyer account
    pub buyer_name: String,
    /// Name of the recipient account, if any
    pub recipient_name: Option<String>,
    /// Items visible to the caller, in creation order
    pub items: Vec<ItemView>,
    /// Number of visible items
    pub item_count: usize,
    /// Visible items per status
    pub counts: StatusCounts,
    /// See [`overall_status`]
    pub overall_status: Option<ItemStatus>,
}

/// One page of orders, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPage {
    /// Orders on this page
    pub orders: Vec<OrderView>,
    /// Page number, starting at 1
    pub page: u64,
    /// Page size used
    pub limit: u64,
    /// Matching orders over all pages
    pub total_orders: u64,
    /// Number of pages
    pub total_pages: u64,
}

#[derive(Debug, Clone, Copy)]
enum Scope {
    Buyer(i64),
    Seller(i64),
    All,
}

/// Orders the caller placed.
pub async fn buyer_history(
    db: &DatabaseConnection,
    actor: Actor,
    filter: &OrderFilter,
    page: PageRequest,
) -> Result<OrderPage> {
    list_orders(db, actor, Scope::Buyer(actor.user_id), filter, page).await
}

/// Orders the caller sells into or receives as recipient.
pub async fn seller_orders(
    db: &DatabaseConnection,
    actor: Actor,
    filter: &OrderFilter,
    page: PageRequest,
) -> Result<OrderPage> {
    list_orders(db, actor, Scope::Seller(actor.user_id), filter, page).await
}

/// Every order on the platform.
///
/// # Errors
/// `RoleNotPermitted` unless the caller is an admin.
pub async fn admin_orders(
    db: &DatabaseConnection,
    actor: Actor,
    filter: &OrderFilter,
    page: PageRequest,
) -> Result<OrderPage> {
    actor.require_role(&[Role::Admin], "list all orders")?;
    list_orders(db, actor, Scope::All, filter, page).await
}

/// One order as the caller may see it.
///
/// # Errors
/// `OrderNotFound` when the order does not exist or the caller is neither its buyer,
/// its recipient, a seller on it, nor an admin.
pub async fn get_order_detail(
    db: &DatabaseConnection,
    actor: Actor,
    order_id: i64,
) -> Result<OrderView> {
    let not_found = || Error::OrderNotFound { order_id };
    let order = repository::find_order(db, order_id)
        .await?
        .ok_or_else(not_found)?;
    let items = repository::items_for_order(db, order_id).await?;

    let sells_here = items
        .iter()
        .any(|item| item.seller_id == Some(actor.user_id));
    if !sees_all_items(actor, &order) && !sells_here {
        return Err(not_found());
    }

    let mut views = expand_orders(db, actor, vec![order], items).await?;
    views.pop().ok_or_else(not_found)
}

async fn list_orders(
    db: &DatabaseConnection,
    actor: Actor,
    scope: Scope,
    filter: &OrderFilter,
    page: PageRequest,
) -> Result<OrderPage> {
    let page = page.normalized();

    let mut condition = Condition::all().add(scope_condition(scope));
    if let Some(status) = filter.status {
        condition = condition.add(status_condition(scope, status));
    }
    if let Some(transaction_type) = filter.transaction_type {
        condition = condition.add(order::Column::TransactionType.eq(transaction_type));
    }
    if let Some(term) = filter.search_term() {
        condition = condition.add(search_condition(scope, term));
    }

    let paginator = Order::find()
        .filter(condition)
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .paginate(db, page.limit);
    let totals = paginator.num_items_and_pages().await?;
    let orders = paginator.fetch_page(page.page - 1).await?;

    debug!(
        "Listing page {} of {} ({} orders match) for account {}",
        page.page, totals.number_of_pages, totals.number_of_items, actor.user_id
    );

    let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let items = repository::items_for_orders(db, &order_ids).await?;
    let orders = expand_orders(db, actor, orders, items).await?;

    Ok(OrderPage {
        orders,
        page: page.page,
        limit: page.limit,
        total_orders: totals.number_of_items,
        total_pages: totals.number_of_pages,
    })
}

fn sees_all_items(actor: Actor, order: &order::Model) -> bool {
    actor.is_admin()
        || order.buyer_id == actor.user_id
        || order.recipient_id == Some(actor.user_id)
}

/// Subquery selecting the order IDs of items matching `condition`.
fn orders_with_items(condition: impl IntoCondition) -> SelectStatement {
    Query::select()
        .column(order_item::Column::OrderId)
        .from(OrderItem)
        .cond_where(condition)
        .to_owned()
}

fn accounts_named(term: &str) -> SelectStatement {
    Query::select()
        .column(account::Column::Id)
        .from(Account)
        .and_where(account::Column::Name.like(containing(term)))
        .to_owned()
}

fn scope_condition(scope: Scope) -> Condition {
    match scope {
        Scope::Buyer(user_id) => Condition::all().add(order::Column::BuyerId.eq(user_id)),
        Scope::Seller(user_id) => Condition::any()
            .add(order::Column::RecipientId.eq(user_id))
            .add(
                order::Column::Id
                    .in_subquery(orders_with_items(order_item::Column::SellerId.eq(user_id))),
            ),
        Scope::All => Condition::all(),
    }
}

fn status_condition(scope: Scope, status: ItemStatus) -> Condition {
    let with_status = order_item::Column::Status.eq(status);
    match scope {
        Scope::Seller(user_id) => Condition::any()
            .add(
                order::Column::Id.in_subquery(orders_with_items(
                    Condition::all()
                        .add(with_status.clone())
                        .add(order_item::Column::SellerId.eq(user_id)),
                )),
            )
            .add(
                Condition::all()
                    .add(order::Column::RecipientId.eq(user_id))
                    .add(order::Column::Id.in_subquery(orders_with_items(with_status))),
            ),
        Scope::Buyer(_) | Scope::All => {
            Condition::all().add(order::Column::Id.in_subquery(orders_with_items(with_status)))
        }
    }
}

fn search_condition(scope: Scope, term: &str) -> Condition {
    let drugs_named = Query::select()
        .column(drug::Column::Id)
        .from(Drug)
        .and_where(drug::Column::Name.like(containing(term)))
        .to_owned();
    let item_matches = Condition::any()
        .add(order_item::Column::CustomName.like(containing(term)))
        .add(order_item::Column::ManufacturerName.like(containing(term)))
        .add(order_item::Column::BatchNo.like(containing(term)))
        .add(order_item::Column::SellerId.in_subquery(accounts_named(term)))
        .add(order_item::Column::DrugId.in_subquery(drugs_named));

    // Item fields only count when the item is visible to the caller
    let items_condition = match scope {
        Scope::Seller(user_id) => Condition::any()
            .add(order::Column::Id.in_subquery(orders_with_items(
                Condition::all()
                    .add(item_matches.clone())
                    .add(order_item::Column::SellerId.eq(user_id)),
            )))
            .add(
                Condition::all()
                    .add(order::Column::RecipientId.eq(user_id))
                    .add(order::Column::Id.in_subquery(orders_with_items(item_matches))),
            ),
        Scope::Buyer(_) | Scope::All => {
            Condition::all().add(order::Column::Id.in_subquery(orders_with_items(item_matches)))
        }
    };

    Condition::any()
        .add(order::Column::OrderNumber.like(containing(term)))
        .add(order::Column::BuyerId.in_subquery(accounts_named(term)))
        .add(order::Column::RecipientId.in_subquery(accounts_named(term)))
        .add(items_condition)
}

/// `LIKE` pattern matching `term` literally anywhere in a column.
fn containing(term: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape('\\')
}

/// Attaches visible items and display names to a batch of orders.
async fn expand_orders<C>(
    db: &C,
    actor: Actor,
    orders: Vec<order::Model>,
    items: Vec<order_item::Model>,
) -> Result<Vec<OrderView>>
where
    C: ConnectionTrait,
{
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let mut account_ids = BTreeSet::new();
    for order in &orders {
        account_ids.insert(order.buyer_id);
        account_ids.extend(order.recipient_id);
    }
    account_ids.extend(items.iter().filter_map(|item| item.seller_id));
    let drug_ids: BTreeSet<i64> = items.iter().filter_map(|item| item.drug_id).collect();

    let account_names: HashMap<i64, String> = Account::find()
        .filter(account::Column::Id.is_in(account_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect();
    let drug_names: HashMap<i64, String> = if drug_ids.is_empty() {
        HashMap::new()
    } else {
        Drug::find()
            .filter(drug::Column::Id.is_in(drug_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|d| (d.id, d.name))
            .collect()
    };

    let mut by_order: HashMap<i64, Vec<order_item::Model>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    let name_of = |id: i64| {
        account_names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("Account #{id}"))
    };

    let views = orders
        .into_iter()
        .map(|order| {
            let full_view = sees_all_items(actor, &order);
            let items: Vec<ItemView> = by_order
                .remove(&order.id)
                .unwrap_or_default()
                .into_iter()
                .filter(|item| full_view || item.seller_id == Some(actor.user_id))
                .map(|item| {
                    let drug_name = item.drug_id.and_then(|id| drug_names.get(&id).cloned());
                    let seller_name = item
                        .seller_id
                        .map(name_of)
                        .or_else(|| item.manufacturer_name.clone());
                    let display_name = drug_name
                        .clone()
                        .or_else(|| item.custom_name.clone())
                        .unwrap_or_else(|| format!("Item #{}", item.id));
                    ItemView {
                        item,
                        drug_name,
                        seller_name,
                        display_name,
                    }
                })
                .collect();

            let statuses = items.iter().map(|view| view.item.status);
            OrderView {
                buyer_name: name_of(order.buyer_id),
                recipient_name: order.recipient_id.map(name_of),
                item_count: items.len(),
                counts: StatusCounts::tally(statuses.clone()),
                overall_status: overall_status(statuses),
                items,
                order,
            }
        })
        .collect();

    Ok(views)
}
