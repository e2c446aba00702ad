//! Account entity - the identity projection the order engine reads.
//!
//! Accounts are managed by the external identity service; the engine only needs the
//! display name (for search and views), the role tier, and the chat handle used by
//! the bot to resolve the caller.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role tier of an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform operator with cross-tenant visibility
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Hospital or institute that both buys and sells stock
    #[sea_orm(string_value = "institute")]
    Institute,
    /// Pharmacy that buys from institutes and manufacturers
    #[sea_orm(string_value = "pharmacy")]
    Pharmacy,
}

impl Role {
    /// Lowercase name as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Institute => "institute",
            Self::Pharmacy => "pharmacy",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Unique identifier for the account
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (institute or pharmacy name)
    pub name: String,
    /// Role tier
    pub role: Role,
    /// Discord user ID linked to this account, if any
    #[sea_orm(unique)]
    pub discord_id: Option<String>,
    /// When the account was created
    pub created_at: DateTime,
}

/// Defines relationships between Account and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One account owns many drugs
    #[sea_orm(has_many = "super::drug::Entity")]
    Drugs,
}

impl Related<super::drug::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Drugs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
