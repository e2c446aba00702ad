//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod account;
pub mod drug;
pub mod order;
pub mod order_item;

// Re-export specific types to avoid conflicts
pub use account::{Column as AccountColumn, Entity as Account, Model as AccountModel, Role};
pub use drug::{Column as DrugColumn, Entity as Drug, Model as DrugModel};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel, TransactionType};
pub use order_item::{
    Column as OrderItemColumn, Entity as OrderItem, ItemStatus, Model as OrderItemModel,
};
