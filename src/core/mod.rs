//! Core business logic - framework-agnostic order and inventory operations.
//!
//! Nothing in here knows about Discord. The bot layer resolves the caller to an
//! [`account::Actor`] and calls these functions; the same functions back the tests.

/// Caller identity and account lookups
pub mod account;
/// Display helpers for amounts, quantities and status summaries
pub mod format;
/// Role-scoped order listings and order detail
pub mod history;
/// Drug lookups and the guarded stock primitive
pub mod inventory;
/// Item status state machine
pub mod item;
/// Order creation
pub mod order;
/// Persistence of orders and order items
pub mod repository;
