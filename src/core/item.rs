//! Item status state machine.
//!
//! Every status change of an order item goes through [`transition_item`]. The legal
//! edges and the stock effect each one carries live together in [`TRANSITIONS`], so
//! an edge can't be legal without its inventory consequence being decided.

use crate::{
    core::{
        account::Actor,
        inventory,
        repository::{self, find_item, find_order},
    },
    entities::{ItemStatus, order_item},
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use tracing::{info, instrument, warn};

/// What a transition does to the drug's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    /// Stock is untouched
    None,
    /// Commit `quantity` units (guarded against going negative)
    Decrement,
    /// Return `quantity` units
    Increment,
    /// Stock is untouched but must currently cover `quantity`
    RequireAvailable,
}

impl StockEffect {
    /// Signed stock change for an item of `quantity` units.
    #[must_use]
    pub const fn delta(self, quantity: i64) -> i64 {
        match self {
            Self::Decrement => -quantity,
            Self::Increment => quantity,
            Self::None | Self::RequireAvailable => 0,
        }
    }
}

/// Every legal `(from, to)` edge with its stock effect.
pub const TRANSITIONS: [(ItemStatus, ItemStatus, StockEffect); 6] = [
    (ItemStatus::Pending, ItemStatus::Approved, StockEffect::Decrement),
    (ItemStatus::Pending, ItemStatus::Rejected, StockEffect::None),
    (ItemStatus::Approved, ItemStatus::Rejected, StockEffect::Increment),
    (ItemStatus::Approved, ItemStatus::Shipped, StockEffect::None),
    (ItemStatus::OutOfStock, ItemStatus::Pending, StockEffect::RequireAvailable),
    (ItemStatus::OutOfStock, ItemStatus::Rejected, StockEffect::None),
];

/// Looks up the edge `from → to`.
///
/// # Errors
/// `IllegalTransition` when the edge is not in [`TRANSITIONS`].
pub fn plan_transition(from: ItemStatus, to: ItemStatus) -> Result<StockEffect> {
    TRANSITIONS
        .iter()
        .find(|(f, t, _)| *f == from && *t == to)
        .map(|(_, _, effect)| *effect)
        .ok_or(Error::IllegalTransition { from, to })
}

/// Outcome of a successful transition.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemTransition {
    /// The item after the change
    pub item: order_item::Model,
    /// Status before the change
    pub previous: ItemStatus,
    /// Stock of the drug after the change, for peer items whose stock was read or moved
    pub stock: Option<i64>,
}

/// Moves an item to `target`, applying the stock effect of the edge.
///
/// Runs in one transaction: the item is read, the caller is checked, the status is
/// compare-and-swapped from the value just read and the stock effect is applied. Any
/// failure leaves both status and stock as they were.
///
/// # Errors
/// `ItemNotFound` when the item does not exist or the caller has nothing to do with
/// its order, `Unauthorized` when the caller is involved but is not the seller,
/// `IllegalTransition`, `ConcurrentModification`, `InsufficientStock` or a storage
/// error.
#[instrument(skip(db, actor), fields(caller = actor.user_id))]
pub async fn transition_item(
    db: &DatabaseConnection,
    actor: Actor,
    item_id: i64,
    target: ItemStatus,
) -> Result<ItemTransition> {
    let txn = db.begin().await?;

    let item = load_for_seller(&txn, actor, item_id).await?;
    let previous = item.status;
    let effect = plan_transition(previous, target)?;

    repository::compare_and_set_status(&txn, item_id, previous, target).await?;

    let stock = match (item.drug_id, effect) {
        (None, _) | (Some(_), StockEffect::None) => None,
        (Some(drug_id), StockEffect::RequireAvailable) => {
            let drug = inventory::require_drug(&txn, drug_id).await?;
            if drug.stock < item.quantity {
                return Err(Error::InsufficientStock {
                    drug_id,
                    available: drug.stock,
                    requested: item.quantity,
                });
            }
            Some(drug.stock)
        }
        (Some(drug_id), StockEffect::Decrement | StockEffect::Increment) => {
            let drug =
                inventory::adjust_stock(&txn, drug_id, effect.delta(item.quantity)).await?;
            Some(drug.stock)
        }
    };

    let item = find_item(&txn, item_id)
        .await?
        .ok_or(Error::ItemNotFound { item_id })?;
    txn.commit().await?;

    info!(
        "Item {} moved from {} to {} by account {}",
        item_id, previous, target, actor.user_id
    );
    Ok(ItemTransition {
        item,
        previous,
        stock,
    })
}

/// Approves a pending item, committing its stock.
pub async fn approve_item(
    db: &DatabaseConnection,
    actor: Actor,
    item_id: i64,
) -> Result<ItemTransition> {
    transition_item(db, actor, item_id, ItemStatus::Approved).await
}

/// Rejects an item, returning stock if it had been approved.
pub async fn reject_item(
    db: &DatabaseConnection,
    actor: Actor,
    item_id: i64,
) -> Result<ItemTransition> {
    transition_item(db, actor, item_id, ItemStatus::Rejected).await
}

/// Marks an approved item as shipped.
pub async fn ship_item(db: &DatabaseConnection, actor: Actor, item_id: i64) -> Result<ItemTransition> {
    transition_item(db, actor, item_id, ItemStatus::Shipped).await
}

/// Puts an out-of-stock item back to pending once stock covers it.
pub async fn restock_item(
    db: &DatabaseConnection,
    actor: Actor,
    item_id: i64,
) -> Result<ItemTransition> {
    transition_item(db, actor, item_id, ItemStatus::Pending).await
}

/// Changes the quantity of a pending item.
///
/// The order header keeps the total captured when it was placed.
///
/// # Errors
/// `InvalidQuantity`, `ItemNotFound`, `Unauthorized`, `IllegalEdit` when the item is
/// not pending, or `ConcurrentModification` when it left `pending` mid-edit.
#[instrument(skip(db, actor), fields(caller = actor.user_id))]
pub async fn edit_item_quantity(
    db: &DatabaseConnection,
    actor: Actor,
    item_id: i64,
    quantity: i64,
) -> Result<order_item::Model> {
    if quantity <= 0 {
        return Err(Error::InvalidQuantity { quantity });
    }

    let txn = db.begin().await?;

    let item = load_for_seller(&txn, actor, item_id).await?;
    if item.status != ItemStatus::Pending {
        return Err(Error::IllegalEdit {
            status: item.status,
        });
    }

    repository::set_pending_quantity(&txn, item_id, quantity).await?;
    let updated = find_item(&txn, item_id)
        .await?
        .ok_or(Error::ItemNotFound { item_id })?;
    txn.commit().await?;

    info!(
        "Item {} quantity changed from {} to {}",
        item_id, item.quantity, quantity
    );
    Ok(updated)
}

/// Loads an item, checking that `actor` may act as its seller.
///
/// Manufacturer items have no seller and are fulfilled by the buyer themselves.
async fn load_for_seller<C>(
    db: &C,
    actor: Actor,
    item_id: i64,
) -> Result<order_item::Model>
where
    C: ConnectionTrait,
{
    let item = find_item(db, item_id)
        .await?
        .ok_or(Error::ItemNotFound { item_id })?;
    let order = find_order(db, item.order_id)
        .await?
        .ok_or(Error::ItemNotFound { item_id })?;

    let may_act = actor.is_admin()
        || match item.seller_id {
            Some(seller_id) => seller_id == actor.user_id,
            None => order.buyer_id == actor.user_id,
        };
    if may_act {
        return Ok(item);
    }

    if order.buyer_id == actor.user_id || order.recipient_id == Some(actor.user_id) {
        warn!(
            "Account {} tried to act on item {} it does not sell",
            actor.user_id, item_id
        );
        return Err(Error::Unauthorized {
            reason: format!("only the seller of item {item_id} can change it"),
        });
    }
    Err(Error::ItemNotFound { item_id })
}
