//! Caller identity and account lookups.
//!
//! Authentication happens outside the engine. Every operation receives an [`Actor`]
//! that has already been resolved; the engine only enforces role and ownership rules
//! against it.

use crate::{
    entities::{Account, Role, account},
    errors::{Error, Result},
};
use sea_orm::prelude::*;

/// The resolved caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// Account ID of the caller
    pub user_id: i64,
    /// Role tier of the caller
    pub role: Role,
}

impl Actor {
    /// Creates an actor from an account ID and role.
    #[must_use]
    pub const fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Whether the caller has cross-tenant visibility.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Fails with `RoleNotPermitted` unless the caller has one of `allowed`.
    pub fn require_role(&self, allowed: &[Role], action: &str) -> Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(Error::RoleNotPermitted {
                role: self.role,
                action: action.to_string(),
            })
        }
    }
}

impl From<&account::Model> for Actor {
    fn from(account: &account::Model) -> Self {
        Self::new(account.id, account.role)
    }
}

/// Finds an account by ID.
pub async fn get_account<C>(db: &C, account_id: i64) -> Result<Option<account::Model>>
where
    C: ConnectionTrait,
{
    Account::find_by_id(account_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds the account linked to a Discord user.
pub async fn get_account_by_discord_id(
    db: &DatabaseConnection,
    discord_id: &str,
) -> Result<Option<account::Model>> {
    Account::find()
        .filter(account::Column::DiscordId.eq(discord_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Resolves a Discord user to the actor it acts as.
///
/// # Errors
/// Returns `AccountNotFound` when no account is linked to `discord_id`.
pub async fn resolve_discord_actor(db: &DatabaseConnection, discord_id: &str) -> Result<Actor> {
    get_account_by_discord_id(db, discord_id)
        .await?
        .map(|account| Actor::from(&account))
        .ok_or_else(|| Error::AccountNotFound {
            account: format!("discord:{discord_id}"),
        })
}
