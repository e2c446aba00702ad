//! Order item entity - one line of an order and the unit of seller approval.
//!
//! A line is either a peer line (`drug_id` set, routed to the drug's owner) or a
//! manufacturer line (`custom_name` and `manufacturer_name` set, no seller).

use crate::errors::Error;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Lifecycle status of a single order item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Waiting for the seller
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Accepted by the seller; stock has been committed
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Declined by the seller (terminal)
    #[sea_orm(string_value = "rejected")]
    Rejected,
    /// Dispatched to the buyer (terminal)
    #[sea_orm(string_value = "shipped")]
    Shipped,
    /// Stock could not cover the line when the order was placed
    #[sea_orm(string_value = "out_of_stock")]
    OutOfStock,
}

impl ItemStatus {
    /// All statuses in triage priority order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::OutOfStock,
        Self::Approved,
        Self::Shipped,
        Self::Rejected,
    ];

    /// Name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Shipped => "shipped",
            Self::OutOfStock => "out_of_stock",
        }
    }

    /// Triage priority; the lowest value among an order's items is the order's
    /// overall status.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::OutOfStock => 1,
            Self::Approved => 2,
            Self::Shipped => 3,
            Self::Rejected => 4,
        }
    }

    /// No transition leaves a terminal status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Shipped)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| Error::InvalidStatus {
                value: s.to_string(),
            })
    }
}

/// Order item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    /// Unique identifier for the item; creation order follows the id
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning order
    pub order_id: i64,
    /// Catalog drug for peer lines
    pub drug_id: Option<i64>,
    /// Free-form product name for manufacturer lines
    pub custom_name: Option<String>,
    /// Manufacturer for manufacturer lines
    pub manufacturer_name: Option<String>,
    /// Units ordered, always positive
    pub quantity: i64,
    /// Price per unit captured when the order was placed
    pub unit_price: f64,
    /// Seller responsible for the line; None for self-fulfilled manufacturer lines
    pub seller_id: Option<i64>,
    /// Batch number captured when the order was placed
    pub batch_no: Option<String>,
    /// Current lifecycle status
    pub status: ItemStatus,
    /// When the item was created
    pub created_at: DateTime,
    /// When the item last changed
    pub updated_at: DateTime,
}

/// Defines relationships between OrderItem and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one order
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    /// Peer items reference one catalog drug
    #[sea_orm(
        belongs_to = "super::drug::Entity",
        from = "Column::DrugId",
        to = "super::drug::Column::Id"
    )]
    Drug,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::drug::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Drug.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
