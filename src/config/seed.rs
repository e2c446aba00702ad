//! Seed configuration loading from config.toml
//!
//! Accounts (with the Discord handle that maps a chat user to a tenant) and an
//! initial catalog are read from a TOML file and written into an empty database on
//! first start. A database that already holds accounts is left untouched.

use crate::{
    core::inventory,
    entities::{Account, Role, account},
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, PaginatorTrait, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use std::{collections::HashMap, path::Path};
use tracing::info;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
pub struct SeedConfig {
    /// Accounts to create
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
    /// Drugs to list, owned by one of the accounts above
    #[serde(default)]
    pub drugs: Vec<DrugConfig>,
}

/// Configuration for a single account
#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    /// Display name, also used to reference the account from `[[drugs]]`
    pub name: String,
    /// Role tier: `admin`, `institute` or `pharmacy`
    pub role: Role,
    /// Discord user ID that acts as this account
    #[serde(default)]
    pub discord_id: Option<String>,
}

/// Configuration for a single catalog drug
#[derive(Debug, Deserialize, Clone)]
pub struct DrugConfig {
    /// Drug name
    pub name: String,
    /// Batch number
    pub batch_no: String,
    /// Unit price
    pub price: f64,
    /// Initial stock
    pub stock: i64,
    /// Name of the owning account
    pub owner: String,
}

/// What a seeding run wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedSummary {
    /// Accounts inserted
    pub accounts: usize,
    /// Drugs inserted
    pub drugs: usize,
}

/// Loads seed configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SeedConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading configuration from {}", path_ref.display());
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads configuration from `PHARMALINK_CONFIG`, or `./config.toml` when unset.
pub fn load_default_config() -> Result<SeedConfig> {
    let path = std::env::var("PHARMALINK_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    load_config(path)
}

/// Writes the configured accounts and drugs into an empty database.
///
/// Runs in one transaction; an unknown drug owner aborts the whole seed.
pub async fn seed_database(db: &DatabaseConnection, config: &SeedConfig) -> Result<SeedSummary> {
    if Account::find().count(db).await? > 0 {
        info!("Accounts already present, skipping seed");
        return Ok(SeedSummary::default());
    }

    let txn = db.begin().await?;
    let now = chrono::Utc::now().naive_utc();
    let mut ids_by_name = HashMap::new();

    for entry in &config.accounts {
        let created = account::ActiveModel {
            name: Set(entry.name.trim().to_string()),
            role: Set(entry.role),
            discord_id: Set(entry.discord_id.clone()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        ids_by_name.insert(created.name.clone(), created.id);
    }

    for entry in &config.drugs {
        let owner = ids_by_name
            .get(entry.owner.trim())
            .copied()
            .ok_or_else(|| Error::Config {
                message: format!(
                    "Drug '{}' names unknown owner '{}'",
                    entry.name, entry.owner
                ),
            })?;
        inventory::create_drug(
            &txn,
            owner,
            entry.name.clone(),
            entry.batch_no.clone(),
            entry.price,
            entry.stock,
        )
        .await?;
    }

    txn.commit().await?;

    let summary = SeedSummary {
        accounts: config.accounts.len(),
        drugs: config.drugs.len(),
    };
    info!(
        "Seeded {} accounts and {} drugs",
        summary.accounts, summary.drugs
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::Drug;
    use crate::test_utils::setup_test_db;

    const SAMPLE: &str = r#"
        [[accounts]]
        name = "City Hospital"
        role = "institute"
        discord_id = "1001"

        [[accounts]]
        name = "Corner Pharmacy"
        role = "pharmacy"

        [[drugs]]
        name = "Amoxicillin 500mg"
        batch_no = "AMX-2024-01"
        price = 12.5
        stock = 40
        owner = "City Hospital"
    "#;

    #[test]
    fn test_parse_seed_config() {
        let config: SeedConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.accounts[0].role, Role::Institute);
        assert_eq!(config.accounts[0].discord_id.as_deref(), Some("1001"));
        assert!(config.accounts[1].discord_id.is_none());
        assert_eq!(config.drugs[0].price, 12.5);
        assert_eq!(config.drugs[0].owner, "City Hospital");
    }

    #[test]
    fn test_example_config_parses() -> Result<()> {
        let config = load_config(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.toml"))?;
        assert_eq!(config.accounts.len(), 4);
        assert!(
            config
                .drugs
                .iter()
                .all(|drug| config.accounts.iter().any(|a| a.name == drug.owner))
        );
        Ok(())
    }

    #[test]
    fn test_parse_rejects_unknown_role() {
        let result: std::result::Result<SeedConfig, _> = toml::from_str(
            r#"
            [[accounts]]
            name = "Somebody"
            role = "wholesaler"
        "#,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_seed_database_once() -> Result<()> {
        let db = setup_test_db().await?;
        let config: SeedConfig = toml::from_str(SAMPLE).unwrap();

        let summary = seed_database(&db, &config).await?;
        assert_eq!(summary, SeedSummary { accounts: 2, drugs: 1 });

        let drugs = Drug::find().all(&db).await?;
        assert_eq!(drugs.len(), 1);
        assert_eq!(drugs[0].stock, 40);

        // Second run leaves the database alone
        let summary = seed_database(&db, &config).await?;
        assert_eq!(summary, SeedSummary::default());
        assert_eq!(Account::find().count(&db).await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_unknown_owner_rolls_back() -> Result<()> {
        let db = setup_test_db().await?;
        let mut config: SeedConfig = toml::from_str(SAMPLE).unwrap();
        config.drugs[0].owner = "Nobody".to_string();

        let result = seed_database(&db, &config).await;
        assert!(matches!(result, Err(Error::Config { .. })));
        assert_eq!(Account::find().count(&db).await?, 0);
        Ok(())
    }
}
