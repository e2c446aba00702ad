//! Drug entity - one catalog record in the inventory store.
//!
//! Identity fields (name, batch, price) are immutable once listed. `stock` is the single
//! shared mutable resource of the platform and is only changed through
//! [`crate::core::inventory::adjust_stock`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Drug database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "drugs")]
pub struct Model {
    /// Unique identifier for the drug
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Drug name (e.g., "Amoxicillin 500mg")
    pub name: String,
    /// Manufacturer batch number
    pub batch_no: String,
    /// Unit price in dollars
    pub price: f64,
    /// Units on hand
    pub stock: i64,
    /// Owning seller account
    pub created_by: i64,
    /// When the drug was listed
    pub created_at: DateTime,
    /// When the record (stock) last changed
    pub updated_at: DateTime,
}

/// Defines relationships between Drug and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each drug belongs to one seller account
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::CreatedBy",
        to = "super::account::Column::Id"
    )]
    Owner,
    /// One drug appears on many order items
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
