//! Order entity - the header of one buyer-initiated purchase.
//!
//! The header is written once at creation; everything that happens afterwards happens
//! on the order's items.

use crate::errors::Error;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Channel an order was placed through. Selects validation rules and the legal item shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Institute buying catalog stock from other institutes, routed per item
    #[sea_orm(string_value = "institute")]
    Institute,
    /// Free-form purchase from an external manufacturer, auto-approved
    #[sea_orm(string_value = "manufacturer")]
    Manufacturer,
    /// Pharmacy buying from a single named institute, all-or-nothing
    #[sea_orm(string_value = "pharmacy_to_institute")]
    PharmacyToInstitute,
}

impl TransactionType {
    /// Name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Institute => "institute",
            Self::Manufacturer => "manufacturer",
            Self::PharmacyToInstitute => "pharmacy_to_institute",
        }
    }

    /// Order number prefix for this channel.
    #[must_use]
    pub const fn order_prefix(self) -> &'static str {
        match self {
            Self::Institute => "INS",
            Self::Manufacturer => "MFR",
            Self::PharmacyToInstitute => "PHR",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    /// Accepts `pharmacy_to_institute`, `pharmacyToInstitute`, `pharmacy-to-institute`, etc.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "institute" => Ok(Self::Institute),
            "manufacturer" => Ok(Self::Manufacturer),
            "pharmacytoinstitute" => Ok(Self::PharmacyToInstitute),
            _ => Err(Error::InvalidTransactionType {
                value: s.to_string(),
            }),
        }
    }
}

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable order number, e.g. `INS-3F9A01BC`
    #[sea_orm(unique)]
    pub order_number: String,
    /// Account that placed the order
    pub buyer_id: i64,
    /// Addressed institute for peer orders, None for manufacturer orders
    pub recipient_id: Option<i64>,
    /// Channel the order was placed through
    pub transaction_type: TransactionType,
    /// Sum of line values excluding out-of-stock lines, fixed at creation
    pub total_amount: f64,
    /// Free-text notes from the buyer
    pub notes: Option<String>,
    /// When the order was placed
    pub created_at: DateTime,
    /// When the header was last written
    pub updated_at: DateTime,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One order has many items
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_parsing() {
        assert_eq!(
            "institute".parse::<TransactionType>().ok(),
            Some(TransactionType::Institute)
        );
        assert_eq!(
            "Manufacturer".parse::<TransactionType>().ok(),
            Some(TransactionType::Manufacturer)
        );
        assert_eq!(
            "pharmacyToInstitute".parse::<TransactionType>().ok(),
            Some(TransactionType::PharmacyToInstitute)
        );
        assert_eq!(
            "pharmacy_to_institute".parse::<TransactionType>().ok(),
            Some(TransactionType::PharmacyToInstitute)
        );
    }

    #[test]
    fn test_transaction_type_rejects_unknown() {
        let err = "wholesale".parse::<TransactionType>();
        assert!(matches!(
            err,
            Err(Error::InvalidTransactionType { ref value }) if value == "wholesale"
        ));
    }

    #[test]
    fn test_order_prefixes_are_distinct() {
        assert_eq!(TransactionType::Institute.order_prefix(), "INS");
        assert_eq!(TransactionType::Manufacturer.order_prefix(), "MFR");
        assert_eq!(TransactionType::PharmacyToInstitute.order_prefix(), "PHR");
    }
}
