//! Shared test utilities for the order engine.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{account::Actor, inventory},
    entities::{Role, account, drug},
    errors::Result,
};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output through the test harness. Safe to call more than once.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
///
/// The pool is pinned to a single connection: every connection to `sqlite::memory:`
/// would otherwise open its own empty database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A file-backed `SQLite` database whose pool holds several connections, so
/// concurrent transactions really overlap. The files are removed on drop.
pub struct SharedTestDb {
    /// Database connection pool
    pub db: DatabaseConnection,
    path: PathBuf,
}

impl Drop for SharedTestDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

/// Creates a [`SharedTestDb`] in the system temp directory with all tables initialized.
pub async fn setup_shared_test_db() -> Result<SharedTestDb> {
    init_test_tracing();
    let path = std::env::temp_dir().join(format!("pharmalink-test-{}.db", uuid::Uuid::new_v4()));
    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    options
        .max_connections(4)
        .min_connections(2)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(SharedTestDb { db, path })
}

/// Creates an account with the given role and no Discord link.
pub async fn create_test_account(
    db: &DatabaseConnection,
    name: &str,
    role: Role,
) -> Result<account::Model> {
    insert_account(db, name, role, None).await
}

/// Creates an account linked to a Discord user ID.
pub async fn create_linked_account(
    db: &DatabaseConnection,
    name: &str,
    role: Role,
    discord_id: &str,
) -> Result<account::Model> {
    insert_account(db, name, role, Some(discord_id.to_string())).await
}

async fn insert_account(
    db: &DatabaseConnection,
    name: &str,
    role: Role,
    discord_id: Option<String>,
) -> Result<account::Model> {
    account::ActiveModel {
        name: Set(name.to_string()),
        role: Set(role),
        discord_id: Set(discord_id),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a test drug with sensible defaults.
///
/// # Defaults
/// * `price`: 10.0
/// * `batch_no`: `"BATCH-<name>"`
pub async fn create_test_drug(
    db: &DatabaseConnection,
    owner_id: i64,
    name: &str,
    stock: i64,
) -> Result<drug::Model> {
    create_custom_drug(db, owner_id, name, &format!("BATCH-{name}"), 10.0, stock).await
}

/// Creates a test drug with custom batch and price.
pub async fn create_custom_drug(
    db: &DatabaseConnection,
    owner_id: i64,
    name: &str,
    batch_no: &str,
    price: f64,
    stock: i64,
) -> Result<drug::Model> {
    inventory::create_drug(
        db,
        owner_id,
        name.to_string(),
        batch_no.to_string(),
        price,
        stock,
    )
    .await
}

/// A small marketplace: two institutes, a pharmacy, an admin and one listed drug.
pub struct Marketplace {
    /// Database connection
    pub db: DatabaseConnection,
    /// Institute that buys
    pub buyer: Actor,
    /// Institute that owns `drug`
    pub seller: Actor,
    /// Pharmacy account
    pub pharmacy: Actor,
    /// Platform admin
    pub admin: Actor,
    /// Drug owned by `seller`, price 10.0
    pub drug: drug::Model,
}

/// Sets up a [`Marketplace`] whose drug has the given stock.
pub async fn setup_marketplace(stock: i64) -> Result<Marketplace> {
    populate_marketplace(setup_test_db().await?, stock).await
}

/// Fills an existing database with the accounts and drug of a [`Marketplace`].
pub async fn populate_marketplace(db: DatabaseConnection, stock: i64) -> Result<Marketplace> {
    let buyer = create_test_account(&db, "General Hospital", Role::Institute).await?;
    let seller = create_test_account(&db, "City Clinic", Role::Institute).await?;
    let pharmacy = create_test_account(&db, "Corner Pharmacy", Role::Pharmacy).await?;
    let admin = create_test_account(&db, "Platform Admin", Role::Admin).await?;
    let drug = create_custom_drug(&db, seller.id, "Amoxicillin", "AMX-001", 10.0, stock).await?;
    Ok(Marketplace {
        db,
        buyer: Actor::from(&buyer),
        seller: Actor::from(&seller),
        pharmacy: Actor::from(&pharmacy),
        admin: Actor::from(&admin),
        drug,
    })
}
