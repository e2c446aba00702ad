//! Order creation business logic.
//!
//! A buyer's cart arrives as loosely shaped [`CartLine`]s plus a transaction type
//! string. [`OrderRequest::parse`] turns that into a tagged union whose variants only
//! carry the fields legal for their channel; [`create_order`] then prices every line,
//! decides its initial status and writes the order and its items in one database
//! transaction. No stock is touched here: inventory is only committed when a seller
//! approves an item (see [`crate::core::item`]).

use crate::{
    core::{
        account::{self, Actor},
        inventory,
        repository::{self, ItemDraft, OrderDraft},
    },
    entities::{ItemStatus, Role, TransactionType, order, order_item},
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument};

/// One line of a cart as submitted by a buyer, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Catalog drug for peer orders
    #[serde(default)]
    pub drug_id: Option<i64>,
    /// Product name for manufacturer orders
    #[serde(default)]
    pub custom_name: Option<String>,
    /// Manufacturer for manufacturer orders
    #[serde(default)]
    pub manufacturer_name: Option<String>,
    /// Units requested
    pub quantity: i64,
    /// Agreed unit price for manufacturer orders; peer lines use the catalog price
    #[serde(default)]
    pub unit_price: Option<f64>,
}

impl CartLine {
    /// A line for a catalog drug.
    #[must_use]
    pub const fn drug(drug_id: i64, quantity: i64) -> Self {
        Self {
            drug_id: Some(drug_id),
            custom_name: None,
            manufacturer_name: None,
            quantity,
            unit_price: None,
        }
    }

    /// A free-form line bought from a manufacturer.
    #[must_use]
    pub fn manufactured(
        custom_name: impl Into<String>,
        manufacturer_name: impl Into<String>,
        quantity: i64,
        unit_price: f64,
    ) -> Self {
        Self {
            drug_id: None,
            custom_name: Some(custom_name.into()),
            manufacturer_name: Some(manufacturer_name.into()),
            quantity,
            unit_price: Some(unit_price),
        }
    }

    const fn has_manufacturer_fields(&self) -> bool {
        self.custom_name.is_some() || self.manufacturer_name.is_some()
    }
}

/// A cart submission as received from the outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    /// `institute`, `manufacturer` or `pharmacy_to_institute`
    pub transaction_type: String,
    /// Cart lines
    pub items: Vec<CartLine>,
    /// Addressed institute
    #[serde(default)]
    pub recipient_id: Option<i64>,
    /// Free-text notes
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewOrder {
    /// Creates a submission without recipient or notes.
    #[must_use]
    pub fn new(transaction_type: impl Into<String>, items: Vec<CartLine>) -> Self {
        Self {
            transaction_type: transaction_type.into(),
            items,
            recipient_id: None,
            notes: None,
        }
    }

    /// Sets the addressed institute.
    #[must_use]
    pub fn with_recipient(mut self, recipient_id: i64) -> Self {
        self.recipient_id = Some(recipient_id);
        self
    }

    /// Sets the buyer notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A validated line that references a catalog drug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerLine {
    /// Catalog drug
    pub drug_id: i64,
    /// Units requested, positive
    pub quantity: i64,
}

impl PeerLine {
    fn from_cart(index: usize, line: CartLine) -> Result<Self> {
        if line.has_manufacturer_fields() {
            return Err(Error::InvalidItemsList {
                reason: format!("item {index} mixes a catalog drug with manufacturer fields"),
            });
        }
        let drug_id = line.drug_id.ok_or_else(|| Error::InvalidItemsList {
            reason: format!("item {index} has no drug id"),
        })?;
        Ok(Self {
            drug_id,
            quantity: positive_quantity(line.quantity)?,
        })
    }
}

/// A validated free-form manufacturer line.
#[derive(Debug, Clone, PartialEq)]
pub struct ManufacturerLine {
    /// Product name
    pub custom_name: String,
    /// Manufacturer name
    pub manufacturer_name: String,
    /// Units requested, positive
    pub quantity: i64,
    /// Agreed unit price, positive
    pub unit_price: f64,
}

impl ManufacturerLine {
    fn from_cart(index: usize, line: CartLine) -> Result<Self> {
        if line.drug_id.is_some() {
            return Err(Error::InvalidItemsList {
                reason: format!("item {index} references a catalog drug in a manufacturer order"),
            });
        }
        let missing = || Error::MissingManufacturerFields { index };
        let custom_name = non_blank(line.custom_name).ok_or_else(missing)?;
        let manufacturer_name = non_blank(line.manufacturer_name).ok_or_else(missing)?;
        let unit_price = line.unit_price.ok_or_else(missing)?;
        if !unit_price.is_finite() || unit_price <= 0.0 {
            return Err(Error::InvalidAmount { amount: unit_price });
        }
        Ok(Self {
            custom_name,
            manufacturer_name,
            quantity: positive_quantity(line.quantity)?,
            unit_price,
        })
    }
}

/// A validated order, one variant per transaction type.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderRequest {
    /// Catalog lines routed to each drug's owner; partial fulfilment allowed.
    Institute {
        /// Lines in cart order
        lines: Vec<PeerLine>,
        /// Header recipient; stored but not used for routing
        recipient_id: Option<i64>,
    },
    /// Free-form lines from an external manufacturer, approved on creation.
    Manufacturer {
        /// Lines in cart order
        lines: Vec<ManufacturerLine>,
    },
    /// Catalog lines all supplied by one institute; all-or-nothing.
    PharmacyToInstitute {
        /// Supplying institute
        recipient_id: i64,
        /// Lines in cart order
        lines: Vec<PeerLine>,
    },
}

impl OrderRequest {
    /// Validates a raw cart against the rules of its transaction type.
    ///
    /// # Errors
    /// `InvalidTransactionType`, `InvalidItemsList`, `MissingManufacturerFields`,
    /// `InvalidQuantity`, `InvalidAmount` or `MissingRecipient`.
    pub fn parse(
        transaction_type: &str,
        items: Vec<CartLine>,
        recipient_id: Option<i64>,
    ) -> Result<Self> {
        let transaction_type: TransactionType = transaction_type.parse()?;
        if items.is_empty() {
            return Err(Error::InvalidItemsList {
                reason: "an order needs at least one item".to_string(),
            });
        }

        match transaction_type {
            TransactionType::Institute => Ok(Self::Institute {
                lines: parse_lines(items, PeerLine::from_cart)?,
                recipient_id,
            }),
            TransactionType::Manufacturer => Ok(Self::Manufacturer {
                lines: parse_lines(items, ManufacturerLine::from_cart)?,
            }),
            TransactionType::PharmacyToInstitute => {
                let recipient_id =
                    recipient_id.ok_or(Error::MissingRecipient { transaction_type })?;
                Ok(Self::PharmacyToInstitute {
                    recipient_id,
                    lines: parse_lines(items, PeerLine::from_cart)?,
                })
            }
        }
    }

    /// The channel this request belongs to.
    #[must_use]
    pub const fn transaction_type(&self) -> TransactionType {
        match self {
            Self::Institute { .. } => TransactionType::Institute,
            Self::Manufacturer { .. } => TransactionType::Manufacturer,
            Self::PharmacyToInstitute { .. } => TransactionType::PharmacyToInstitute,
        }
    }

    /// Recipient stored on the order header.
    #[must_use]
    pub const fn recipient_id(&self) -> Option<i64> {
        match self {
            Self::Institute { recipient_id, .. } => *recipient_id,
            Self::Manufacturer { .. } => None,
            Self::PharmacyToInstitute { recipient_id, .. } => Some(*recipient_id),
        }
    }

    /// Roles allowed to place this kind of order.
    #[must_use]
    pub const fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Self::Institute { .. } => &[Role::Institute],
            Self::Manufacturer { .. } => &[Role::Institute, Role::Pharmacy],
            Self::PharmacyToInstitute { .. } => &[Role::Pharmacy],
        }
    }
}

/// Result of a successful order placement.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    /// The written header
    pub order: order::Model,
    /// The written items in cart order
    pub items: Vec<order_item::Model>,
}

impl PlacedOrder {
    /// ID of the new order
    #[must_use]
    pub const fn order_id(&self) -> i64 {
        self.order.id
    }

    /// Human-readable order number
    #[must_use]
    pub fn order_number(&self) -> &str {
        &self.order.order_number
    }

    /// Total over the lines that were in stock
    #[must_use]
    pub const fn total_amount(&self) -> f64 {
        self.order.total_amount
    }
}

/// Places an order for `actor`.
///
/// The cart is validated before the database is touched. Inside one transaction every
/// referenced drug is looked up, each line gets its captured price, batch, seller and
/// initial status, and the header and items are written. Any failure rolls the whole
/// order back; the only per-line failure that does not is an out-of-stock line in an
/// `institute` order, which is written as `out_of_stock` and left out of the total.
///
/// # Errors
/// Validation errors from [`OrderRequest::parse`], `RoleNotPermitted`, `DrugNotFound`,
/// `SelfPurchase`, `AccountNotFound`, `RecipientNotAnInstitute`, `InsufficientStock`
/// (pharmacy orders only) or a storage error.
#[instrument(skip(db, new_order), fields(buyer = actor.user_id, transaction_type = %new_order.transaction_type))]
pub async fn create_order(
    db: &DatabaseConnection,
    actor: Actor,
    new_order: NewOrder,
) -> Result<PlacedOrder> {
    let request = OrderRequest::parse(
        &new_order.transaction_type,
        new_order.items,
        new_order.recipient_id,
    )?;
    let transaction_type = request.transaction_type();
    actor.require_role(
        request.allowed_roles(),
        &format!("place {transaction_type} orders"),
    )?;

    let txn = db.begin().await?;

    let drafts = match &request {
        OrderRequest::Institute { lines, .. } => plan_institute_lines(&txn, actor, lines).await?,
        OrderRequest::Manufacturer { lines } => plan_manufacturer_lines(lines),
        OrderRequest::PharmacyToInstitute {
            recipient_id,
            lines,
        } => plan_pharmacy_lines(&txn, *recipient_id, lines).await?,
    };

    let header = OrderDraft {
        buyer_id: actor.user_id,
        recipient_id: request.recipient_id(),
        transaction_type,
        total_amount: order_total(&drafts),
        notes: non_blank(new_order.notes),
    };
    let (order, items) = repository::insert_order_with_items(&txn, header, drafts).await?;

    txn.commit().await?;

    let out_of_stock = items
        .iter()
        .filter(|item| item.status == ItemStatus::OutOfStock)
        .count();
    info!(
        "Order {} placed with {} items ({} out of stock), total {:.2}",
        order.order_number,
        items.len(),
        out_of_stock,
        order.total_amount
    );

    Ok(PlacedOrder { order, items })
}

/// Sum of `unit_price × quantity` over every line that is not out of stock.
#[must_use]
pub fn order_total(items: &[ItemDraft]) -> f64 {
    items
        .iter()
        .filter(|item| item.status != ItemStatus::OutOfStock)
        .map(ItemDraft::line_total)
        .sum()
}

async fn plan_institute_lines<C>(db: &C, actor: Actor, lines: &[PeerLine]) -> Result<Vec<ItemDraft>>
where
    C: sea_orm::ConnectionTrait,
{
    let mut drafts = Vec::with_capacity(lines.len());
    for line in lines {
        let drug = inventory::require_drug(db, line.drug_id).await?;
        if drug.created_by == actor.user_id {
            return Err(Error::SelfPurchase {
                drug_id: drug.id,
            });
        }
        let status = if drug.stock >= line.quantity {
            ItemStatus::Pending
        } else {
            ItemStatus::OutOfStock
        };
        drafts.push(peer_draft(&drug, line.quantity, status));
    }
    Ok(drafts)
}

fn plan_manufacturer_lines(lines: &[ManufacturerLine]) -> Vec<ItemDraft> {
    lines
        .iter()
        .map(|line| ItemDraft {
            drug_id: None,
            custom_name: Some(line.custom_name.clone()),
            manufacturer_name: Some(line.manufacturer_name.clone()),
            quantity: line.quantity,
            unit_price: line.unit_price,
            seller_id: None,
            batch_no: None,
            status: ItemStatus::Approved,
        })
        .collect()
}

async fn plan_pharmacy_lines<C>(
    db: &C,
    recipient_id: i64,
    lines: &[PeerLine],
) -> Result<Vec<ItemDraft>>
where
    C: sea_orm::ConnectionTrait,
{
    let recipient = account::get_account(db, recipient_id)
        .await?
        .ok_or_else(|| Error::AccountNotFound {
            account: recipient_id.to_string(),
        })?;
    if recipient.role != Role::Institute {
        return Err(Error::RecipientNotAnInstitute { recipient_id });
    }

    // Repeated lines for one drug must be covered together
    let mut requested: HashMap<i64, i64> = HashMap::new();
    let mut drafts = Vec::with_capacity(lines.len());
    for line in lines {
        let drug = inventory::require_drug(db, line.drug_id).await?;
        if drug.created_by != recipient_id {
            return Err(Error::DrugNotFound {
                drug_id: line.drug_id,
            });
        }
        let total = requested.entry(drug.id).or_insert(0);
        *total = total
            .checked_add(line.quantity)
            .ok_or(Error::InvalidQuantity {
                quantity: line.quantity,
            })?;
        if drug.stock < *total {
            return Err(Error::InsufficientStock {
                drug_id: drug.id,
                available: drug.stock,
                requested: *total,
            });
        }
        drafts.push(peer_draft(&drug, line.quantity, ItemStatus::Pending));
    }
    Ok(drafts)
}

fn peer_draft(drug: &crate::entities::drug::Model, quantity: i64, status: ItemStatus) -> ItemDraft {
    ItemDraft {
        drug_id: Some(drug.id),
        custom_name: None,
        manufacturer_name: None,
        quantity,
        unit_price: drug.price,
        seller_id: Some(drug.created_by),
        batch_no: Some(drug.batch_no.clone()),
        status,
    }
}

fn parse_lines<T>(items: Vec<CartLine>, parse: fn(usize, CartLine) -> Result<T>) -> Result<Vec<T>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, line)| parse(index, line))
        .collect()
}

fn positive_quantity(quantity: i64) -> Result<i64> {
    if quantity > 0 {
        Ok(quantity)
    } else {
        Err(Error::InvalidQuantity { quantity })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::{Drug, Order, OrderItem};
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, EntityTrait, MockDatabase, PaginatorTrait};

    #[test]
    fn test_parse_rejects_empty_cart() {
        let result = OrderRequest::parse("institute", Vec::new(), None);
        assert!(matches!(result, Err(Error::InvalidItemsList { .. })));
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let result = OrderRequest::parse("barter", vec![CartLine::drug(1, 1)], None);
        assert!(matches!(
            result,
            Err(Error::InvalidTransactionType { .. })
        ));
    }

    #[test]
    fn test_parse_dispatches_on_type() {
        let request =
            OrderRequest::parse("institute", vec![CartLine::drug(4, 2)], Some(9)).unwrap();
        assert_eq!(
            request,
            OrderRequest::Institute {
                lines: vec![PeerLine {
                    drug_id: 4,
                    quantity: 2
                }],
                recipient_id: Some(9),
            }
        );
        assert_eq!(request.recipient_id(), Some(9));

        let request = OrderRequest::parse(
            "manufacturer",
            vec![CartLine::manufactured(" Gauze ", "Acme", 5, 1.5)],
            Some(9),
        )
        .unwrap();
        assert_eq!(request.transaction_type(), TransactionType::Manufacturer);
        // Manufacturer orders never carry a recipient
        assert_eq!(request.recipient_id(), None);
        let OrderRequest::Manufacturer { lines } = request else {
            panic!("expected a manufacturer request");
        };
        assert_eq!(lines[0].custom_name, "Gauze");
    }

    #[test]
    fn test_parse_peer_line_errors() {
        let missing_drug = CartLine {
            quantity: 1,
            ..CartLine::default()
        };
        assert!(matches!(
            OrderRequest::parse("institute", vec![missing_drug], None),
            Err(Error::InvalidItemsList { .. })
        ));

        let mixed = CartLine {
            custom_name: Some("X".to_string()),
            ..CartLine::drug(1, 1)
        };
        assert!(matches!(
            OrderRequest::parse("institute", vec![mixed], None),
            Err(Error::InvalidItemsList { .. })
        ));

        assert!(matches!(
            OrderRequest::parse("institute", vec![CartLine::drug(1, 0)], None),
            Err(Error::InvalidQuantity { quantity: 0 })
        ));
    }

    #[test]
    fn test_parse_manufacturer_line_errors() {
        let no_manufacturer = CartLine {
            manufacturer_name: None,
            ..CartLine::manufactured("X", "Acme", 1, 1.0)
        };
        assert!(matches!(
            OrderRequest::parse("manufacturer", vec![no_manufacturer], None),
            Err(Error::MissingManufacturerFields { index: 0 })
        ));

        let blank_name = CartLine::manufactured("   ", "Acme", 1, 1.0);
        assert!(matches!(
            OrderRequest::parse(
                "manufacturer",
                vec![CartLine::manufactured("A", "Acme", 1, 1.0), blank_name],
                None
            ),
            Err(Error::MissingManufacturerFields { index: 1 })
        ));

        let no_price = CartLine {
            unit_price: None,
            ..CartLine::manufactured("X", "Acme", 1, 1.0)
        };
        assert!(matches!(
            OrderRequest::parse("manufacturer", vec![no_price], None),
            Err(Error::MissingManufacturerFields { index: 0 })
        ));

        assert!(matches!(
            OrderRequest::parse(
                "manufacturer",
                vec![CartLine::manufactured("X", "Acme", 1, -3.0)],
                None
            ),
            Err(Error::InvalidAmount { .. })
        ));

        let with_drug = CartLine {
            drug_id: Some(3),
            ..CartLine::manufactured("X", "Acme", 1, 1.0)
        };
        assert!(matches!(
            OrderRequest::parse("manufacturer", vec![with_drug], None),
            Err(Error::InvalidItemsList { .. })
        ));
    }

    #[test]
    fn test_parse_pharmacy_requires_recipient() {
        assert!(matches!(
            OrderRequest::parse("pharmacyToInstitute", vec![CartLine::drug(1, 1)], None),
            Err(Error::MissingRecipient { .. })
        ));
    }

    #[test]
    fn test_order_total_skips_out_of_stock() {
        let line = |quantity, unit_price, status| ItemDraft {
            drug_id: Some(1),
            custom_name: None,
            manufacturer_name: None,
            quantity,
            unit_price,
            seller_id: Some(1),
            batch_no: None,
            status,
        };
        let drafts = vec![
            line(2, 10.0, ItemStatus::Pending),
            line(5, 3.0, ItemStatus::OutOfStock),
            line(1, 4.5, ItemStatus::Approved),
        ];
        assert_eq!(order_total(&drafts), 24.5);
    }

    #[tokio::test]
    async fn test_create_order_validates_before_touching_storage() -> Result<()> {
        // No query results configured: any database access would fail the test
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let actor = Actor::new(1, Role::Institute);

        let result = create_order(&db, actor, NewOrder::new("institute", Vec::new())).await;
        assert!(matches!(result, Err(Error::InvalidItemsList { .. })));

        let result = create_order(
            &db,
            actor,
            NewOrder::new("manufacturer", vec![CartLine::drug(1, 1)]),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidItemsList { .. })));

        let result = create_order(
            &db,
            Actor::new(2, Role::Admin),
            NewOrder::new("institute", vec![CartLine::drug(1, 1)]),
        )
        .await;
        assert!(matches!(result, Err(Error::RoleNotPermitted { .. })));

        let result = create_order(
            &db,
            actor,
            NewOrder::new("pharmacy_to_institute", vec![CartLine::drug(1, 1)]).with_recipient(5),
        )
        .await;
        assert!(matches!(result, Err(Error::RoleNotPermitted { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_manufacturer_order_is_auto_approved() -> Result<()> {
        let m = setup_marketplace(5).await?;

        let placed = create_order(
            &m.db,
            m.buyer,
            NewOrder::new(
                "manufacturer",
                vec![CartLine::manufactured("X", "Acme", 2, 50.0)],
            ),
        )
        .await?;

        assert_eq!(placed.total_amount(), 100.0);
        assert!(placed.order_number().starts_with("MFR-"));
        assert_eq!(placed.order.recipient_id, None);
        assert_eq!(placed.items.len(), 1);
        let item = &placed.items[0];
        assert_eq!(item.status, ItemStatus::Approved);
        assert_eq!(item.seller_id, None);
        assert_eq!(item.drug_id, None);
        assert_eq!(item.custom_name.as_deref(), Some("X"));
        assert_eq!(item.manufacturer_name.as_deref(), Some("Acme"));
        Ok(())
    }

    #[tokio::test]
    async fn test_institute_order_out_of_stock_line() -> Result<()> {
        let m = setup_marketplace(5).await?;

        let placed = create_order(
            &m.db,
            m.buyer,
            NewOrder::new("institute", vec![CartLine::drug(m.drug.id, 10)]),
        )
        .await?;

        assert_eq!(placed.items[0].status, ItemStatus::OutOfStock);
        assert_eq!(placed.total_amount(), 0.0);
        let drug = Drug::find_by_id(m.drug.id).one(&m.db).await?.unwrap();
        assert_eq!(drug.stock, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_institute_order_partial_fulfilment() -> Result<()> {
        let m = setup_marketplace(5).await?;
        let other_seller = create_test_account(&m.db, "Regional Lab", Role::Institute).await?;
        let gauze =
            create_custom_drug(&m.db, other_seller.id, "Gauze", "GZ-7", 2.5, 100).await?;

        let placed = create_order(
            &m.db,
            m.buyer,
            NewOrder::new(
                "institute",
                vec![
                    CartLine::drug(m.drug.id, 3),
                    CartLine::drug(m.drug.id, 50),
                    CartLine::drug(gauze.id, 4),
                ],
            )
            .with_notes("  urgent  "),
        )
        .await?;

        let statuses: Vec<_> = placed.items.iter().map(|i| i.status).collect();
        assert_eq!(
            statuses,
            vec![
                ItemStatus::Pending,
                ItemStatus::OutOfStock,
                ItemStatus::Pending
            ]
        );
        // 3 × 10.0 + 4 × 2.5, the out-of-stock line is excluded
        assert_eq!(placed.total_amount(), 40.0);
        assert_eq!(placed.order.notes.as_deref(), Some("urgent"));

        // Each line is routed to the drug's owner with the catalog batch and price
        assert_eq!(placed.items[0].seller_id, Some(m.seller.user_id));
        assert_eq!(placed.items[0].batch_no.as_deref(), Some("AMX-001"));
        assert_eq!(placed.items[2].seller_id, Some(other_seller.id));
        assert_eq!(placed.items[2].unit_price, 2.5);

        // Creation never moves stock
        let drug = Drug::find_by_id(m.drug.id).one(&m.db).await?.unwrap();
        assert_eq!(drug.stock, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_institute_order_keeps_header_recipient() -> Result<()> {
        let m = setup_marketplace(5).await?;

        let placed = create_order(
            &m.db,
            m.buyer,
            NewOrder::new("institute", vec![CartLine::drug(m.drug.id, 1)])
                .with_recipient(m.pharmacy.user_id),
        )
        .await?;

        assert_eq!(placed.order.recipient_id, Some(m.pharmacy.user_id));
        // Routing still follows the drug owner, not the header
        assert_eq!(placed.items[0].seller_id, Some(m.seller.user_id));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_drug_aborts_whole_order() -> Result<()> {
        let m = setup_marketplace(5).await?;

        let result = create_order(
            &m.db,
            m.buyer,
            NewOrder::new(
                "institute",
                vec![CartLine::drug(m.drug.id, 1), CartLine::drug(9999, 1)],
            ),
        )
        .await;

        assert!(matches!(
            result,
            Err(Error::DrugNotFound { drug_id: 9999 })
        ));
        assert_eq!(Order::find().count(&m.db).await?, 0);
        assert_eq!(OrderItem::find().count(&m.db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_buyer_cannot_order_own_drug() -> Result<()> {
        let m = setup_marketplace(5).await?;

        let result = create_order(
            &m.db,
            m.seller,
            NewOrder::new("institute", vec![CartLine::drug(m.drug.id, 1)]),
        )
        .await;
        assert!(matches!(result, Err(Error::SelfPurchase { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_pharmacy_order_all_or_nothing() -> Result<()> {
        let m = setup_marketplace(5).await?;
        let bandage =
            create_custom_drug(&m.db, m.seller.user_id, "Bandage", "BD-1", 1.0, 2).await?;

        let result = create_order(
            &m.db,
            m.pharmacy,
            NewOrder::new(
                "pharmacyToInstitute",
                vec![CartLine::drug(m.drug.id, 5), CartLine::drug(bandage.id, 3)],
            )
            .with_recipient(m.seller.user_id),
        )
        .await;

        assert!(matches!(
            result,
            Err(Error::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            })
        ));
        assert_eq!(Order::find().count(&m.db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_pharmacy_order_counts_repeated_lines_together() -> Result<()> {
        let m = setup_marketplace(5).await?;

        let result = create_order(
            &m.db,
            m.pharmacy,
            NewOrder::new(
                "pharmacy_to_institute",
                vec![CartLine::drug(m.drug.id, 3), CartLine::drug(m.drug.id, 3)],
            )
            .with_recipient(m.seller.user_id),
        )
        .await;

        assert!(matches!(
            result,
            Err(Error::InsufficientStock { requested: 6, .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_pharmacy_order_repeated_lines_cannot_overflow() -> Result<()> {
        let m = setup_marketplace(i64::MAX).await?;

        let result = create_order(
            &m.db,
            m.pharmacy,
            NewOrder::new(
                "pharmacy_to_institute",
                vec![CartLine::drug(m.drug.id, i64::MAX), CartLine::drug(m.drug.id, 1)],
            )
            .with_recipient(m.seller.user_id),
        )
        .await;

        assert!(matches!(result, Err(Error::InvalidQuantity { quantity: 1 })));
        assert_eq!(Order::find().count(&m.db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_pharmacy_order_success() -> Result<()> {
        let m = setup_marketplace(5).await?;

        let placed = create_order(
            &m.db,
            m.pharmacy,
            NewOrder::new("pharmacy_to_institute", vec![CartLine::drug(m.drug.id, 5)])
                .with_recipient(m.seller.user_id),
        )
        .await?;

        assert!(placed.order_number().starts_with("PHR-"));
        assert_eq!(placed.order.recipient_id, Some(m.seller.user_id));
        assert_eq!(placed.items[0].status, ItemStatus::Pending);
        assert_eq!(placed.items[0].seller_id, Some(m.seller.user_id));
        assert_eq!(placed.total_amount(), 50.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_pharmacy_order_recipient_checks() -> Result<()> {
        let m = setup_marketplace(5).await?;

        let result = create_order(
            &m.db,
            m.pharmacy,
            NewOrder::new("pharmacy_to_institute", vec![CartLine::drug(m.drug.id, 1)])
                .with_recipient(m.admin.user_id),
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::RecipientNotAnInstitute { .. })
        ));

        let result = create_order(
            &m.db,
            m.pharmacy,
            NewOrder::new("pharmacy_to_institute", vec![CartLine::drug(m.drug.id, 1)])
                .with_recipient(4242),
        )
        .await;
        assert!(matches!(result, Err(Error::AccountNotFound { .. })));

        // The drug exists but is not offered by the named institute
        let result = create_order(
            &m.db,
            m.pharmacy,
            NewOrder::new("pharmacy_to_institute", vec![CartLine::drug(m.drug.id, 1)])
                .with_recipient(m.buyer.user_id),
        )
        .await;
        assert!(matches!(result, Err(Error::DrugNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_order_numbers_are_unique() -> Result<()> {
        let m = setup_marketplace(50).await?;
        let mut numbers = std::collections::HashSet::new();
        for _ in 0..10 {
            let placed = create_order(
                &m.db,
                m.buyer,
                NewOrder::new("institute", vec![CartLine::drug(m.drug.id, 1)]),
            )
            .await?;
            assert!(numbers.insert(placed.order.order_number));
        }
        Ok(())
    }
}
