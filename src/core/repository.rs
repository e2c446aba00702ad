//! Order repository - the only code that writes `orders` and `order_items` rows.
//!
//! Writes that must be atomic take a `ConnectionTrait` so callers can run them inside
//! an open `DatabaseTransaction`. Status and quantity updates are compare-and-swap
//! statements keyed on the status the caller observed, so a concurrent writer that got
//! there first makes the update match zero rows instead of silently overwriting it.

use crate::{
    entities::{ItemStatus, Order, OrderItem, TransactionType, order, order_item},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*, sea_query::Expr};
use uuid::Uuid;

const ORDER_NUMBER_ATTEMPTS: usize = 5;

/// Header fields of an order about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    /// Account placing the order
    pub buyer_id: i64,
    /// Addressed institute, if any
    pub recipient_id: Option<i64>,
    /// Channel
    pub transaction_type: TransactionType,
    /// Precomputed total
    pub total_amount: f64,
    /// Buyer notes
    pub notes: Option<String>,
}

/// One item row about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    /// Catalog drug for peer lines
    pub drug_id: Option<i64>,
    /// Product name for manufacturer lines
    pub custom_name: Option<String>,
    /// Manufacturer for manufacturer lines
    pub manufacturer_name: Option<String>,
    /// Units ordered
    pub quantity: i64,
    /// Captured unit price
    pub unit_price: f64,
    /// Responsible seller
    pub seller_id: Option<i64>,
    /// Captured batch number
    pub batch_no: Option<String>,
    /// Initial status
    pub status: ItemStatus,
}

impl ItemDraft {
    /// Value of the line at its captured price.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Quantities are far below 2^52
    pub fn line_total(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

/// Builds a random order number of the form `PREFIX-XXXXXXXX`.
#[must_use]
pub fn generate_order_number(transaction_type: TransactionType) -> String {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(8);
    format!(
        "{}-{}",
        transaction_type.order_prefix(),
        suffix.to_uppercase()
    )
}

/// Picks an order number that is not in use yet.
///
/// The column is also unique in the schema, so a number taken between this check and
/// the insert fails the insert rather than producing a duplicate.
async fn allocate_order_number<C>(db: &C, transaction_type: TransactionType) -> Result<String>
where
    C: ConnectionTrait,
{
    let candidates = std::iter::repeat_with(|| generate_order_number(transaction_type))
        .take(ORDER_NUMBER_ATTEMPTS);
    first_free_order_number(db, candidates).await
}

async fn first_free_order_number<C>(
    db: &C,
    candidates: impl IntoIterator<Item = String>,
) -> Result<String>
where
    C: ConnectionTrait,
{
    for candidate in candidates {
        let taken = Order::find()
            .filter(order::Column::OrderNumber.eq(candidate.as_str()))
            .count(db)
            .await?;
        if taken == 0 {
            return Ok(candidate);
        }
    }
    Err(Error::OrderNumberExhausted {
        attempts: ORDER_NUMBER_ATTEMPTS,
    })
}

/// Writes an order header and its items.
///
/// Must be called inside a transaction; the caller commits. Items are inserted in the
/// given order, which becomes their display order.
pub async fn insert_order_with_items<C>(
    db: &C,
    draft: OrderDraft,
    items: Vec<ItemDraft>,
) -> Result<(order::Model, Vec<order_item::Model>)>
where
    C: ConnectionTrait,
{
    if items.is_empty() {
        return Err(Error::InvalidItemsList {
            reason: "an order needs at least one item".to_string(),
        });
    }

    let now = chrono::Utc::now().naive_utc();
    let order_number = allocate_order_number(db, draft.transaction_type).await?;

    let header = order::ActiveModel {
        order_number: Set(order_number),
        buyer_id: Set(draft.buyer_id),
        recipient_id: Set(draft.recipient_id),
        transaction_type: Set(draft.transaction_type),
        total_amount: Set(draft.total_amount),
        notes: Set(draft.notes),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        let row = order_item::ActiveModel {
            order_id: Set(header.id),
            drug_id: Set(item.drug_id),
            custom_name: Set(item.custom_name),
            manufacturer_name: Set(item.manufacturer_name),
            quantity: Set(item.quantity),
            unit_price: Set(item.unit_price),
            seller_id: Set(item.seller_id),
            batch_no: Set(item.batch_no),
            status: Set(item.status),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
        rows.push(row);
    }

    Ok((header, rows))
}

/// Finds an order by ID.
pub async fn find_order<C>(db: &C, order_id: i64) -> Result<Option<order::Model>>
where
    C: ConnectionTrait,
{
    Order::find_by_id(order_id).one(db).await.map_err(Into::into)
}

/// Finds an order item by ID.
pub async fn find_item<C>(db: &C, item_id: i64) -> Result<Option<order_item::Model>>
where
    C: ConnectionTrait,
{
    OrderItem::find_by_id(item_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Items of one order in creation order.
pub async fn items_for_order<C>(db: &C, order_id: i64) -> Result<Vec<order_item::Model>>
where
    C: ConnectionTrait,
{
    items_for_orders(db, &[order_id]).await
}

/// Items of several orders in creation order.
pub async fn items_for_orders<C>(db: &C, order_ids: &[i64]) -> Result<Vec<order_item::Model>>
where
    C: ConnectionTrait,
{
    if order_ids.is_empty() {
        return Ok(Vec::new());
    }
    OrderItem::find()
        .filter(order_item::Column::OrderId.is_in(order_ids.iter().copied()))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Moves an item from `expected` to `target` if it still has status `expected`.
///
/// # Errors
/// Returns `ConcurrentModification` when the row no longer has the expected status.
pub async fn compare_and_set_status<C>(
    db: &C,
    item_id: i64,
    expected: ItemStatus,
    target: ItemStatus,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = OrderItem::update_many()
        .col_expr(order_item::Column::Status, Expr::value(target.as_str()))
        .col_expr(
            order_item::Column::UpdatedAt,
            Expr::value(chrono::Utc::now().naive_utc()),
        )
        .filter(order_item::Column::Id.eq(item_id))
        .filter(order_item::Column::Status.eq(expected))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::ConcurrentModification { item_id });
    }
    Ok(())
}

/// Sets the quantity of an item that is still pending.
///
/// # Errors
/// Returns `ConcurrentModification` when the item left `pending` after it was read.
pub async fn set_pending_quantity<C>(db: &C, item_id: i64, quantity: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = OrderItem::update_many()
        .col_expr(order_item::Column::Quantity, Expr::value(quantity))
        .col_expr(
            order_item::Column::UpdatedAt,
            Expr::value(chrono::Utc::now().naive_utc()),
        )
        .filter(order_item::Column::Id.eq(item_id))
        .filter(order_item::Column::Status.eq(ItemStatus::Pending))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::ConcurrentModification { item_id });
    }
    Ok(())
}
