//! Inventory store access - drug lookups and the guarded stock primitive.
//!
//! Stock is the one resource shared by every order on the platform. It is never
//! read-modified-written from Rust: all changes go through [`adjust_stock`], which
//! pushes the arithmetic and the sufficiency check into a single conditional UPDATE.

use crate::{
    entities::{Drug, drug},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*, sea_query::Expr};
use tracing::{debug, instrument};

/// Finds a drug by its ID.
pub async fn get_drug<C>(db: &C, drug_id: i64) -> Result<Option<drug::Model>>
where
    C: ConnectionTrait,
{
    Drug::find_by_id(drug_id).one(db).await.map_err(Into::into)
}

/// Finds a drug by its ID, failing with `DrugNotFound` when it does not exist.
pub async fn require_drug<C>(db: &C, drug_id: i64) -> Result<drug::Model>
where
    C: ConnectionTrait,
{
    get_drug(db, drug_id)
        .await?
        .ok_or(Error::DrugNotFound { drug_id })
}

/// Lists a drug in the catalog.
///
/// Catalog management lives outside the order engine; this exists for seeding and
/// fixtures. Validates that the name is not empty, the price is positive and finite
/// and the stock is not negative.
pub async fn create_drug<C>(
    db: &C,
    owner_id: i64,
    name: String,
    batch_no: String,
    price: f64,
    stock: i64,
) -> Result<drug::Model>
where
    C: ConnectionTrait,
{
    if name.trim().is_empty() {
        return Err(Error::Config {
            message: "Drug name cannot be empty".to_string(),
        });
    }
    if !price.is_finite() || price <= 0.0 {
        return Err(Error::InvalidAmount { amount: price });
    }
    if stock < 0 {
        return Err(Error::InvalidQuantity { quantity: stock });
    }

    let now = chrono::Utc::now().naive_utc();
    let drug = drug::ActiveModel {
        name: Set(name.trim().to_string()),
        batch_no: Set(batch_no.trim().to_string()),
        price: Set(price),
        stock: Set(stock),
        created_by: Set(owner_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    drug.insert(db).await.map_err(Into::into)
}

/// Atomically adds `delta` to a drug's stock.
///
/// Decrements are conditional: the UPDATE only matches while `stock >= -delta`, so two
/// concurrent decrements can never drive stock negative. A decrement that matches no
/// row fails with `InsufficientStock` (or `DrugNotFound` if the drug is gone).
///
/// # Returns
/// The drug as it is after the update
#[instrument(skip(db))]
pub async fn adjust_stock<C>(db: &C, drug_id: i64, delta: i64) -> Result<drug::Model>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now().naive_utc();
    let mut update = Drug::update_many()
        .col_expr(
            drug::Column::Stock,
            Expr::col(drug::Column::Stock).add(delta),
        )
        .col_expr(drug::Column::UpdatedAt, Expr::value(now))
        .filter(drug::Column::Id.eq(drug_id));
    if delta < 0 {
        update = update.filter(drug::Column::Stock.gte(-delta));
    }

    let result = update.exec(db).await?;
    if result.rows_affected == 0 {
        let drug = require_drug(db, drug_id).await?;
        return Err(Error::InsufficientStock {
            drug_id,
            available: drug.stock,
            requested: -delta,
        });
    }

    let drug = require_drug(db, drug_id).await?;
    debug!("Stock of drug {} is now {}", drug_id, drug.stock);
    Ok(drug)
}
