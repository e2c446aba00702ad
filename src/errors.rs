//! Unified error type for the order engine.
//!
//! Every variant belongs to one [`ErrorKind`] so callers can tell "your input was
//! invalid" apart from "the system state changed under you" without matching on
//! individual variants.

use crate::entities::{ItemStatus, Role, TransactionType};
use thiserror::Error;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input, rejected before any write
    Validation,
    /// The referenced record does not exist or is not visible to the caller
    NotFound,
    /// Illegal state transition, edit of a non-pending item, or insufficient stock
    Conflict,
    /// The caller is not allowed to perform the operation
    Authorization,
    /// The storage layer failed; the surrounding transaction was rolled back
    Storage,
    /// Configuration, environment, or front-end failures
    Internal,
}

/// Application error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// The cart is empty or otherwise malformed
    #[error("Invalid items list: {reason}")]
    InvalidItemsList {
        /// Why the list was rejected
        reason: String,
    },

    /// Unknown transaction type string
    #[error("Invalid transaction type: '{value}'")]
    InvalidTransactionType {
        /// The rejected input
        value: String,
    },

    /// Unknown item status string
    #[error("Invalid item status: '{value}'")]
    InvalidStatus {
        /// The rejected input
        value: String,
    },

    /// A manufacturer line lacks its name, manufacturer, or price
    #[error("Item {index} is missing manufacturer fields (custom name, manufacturer name, unit price)")]
    MissingManufacturerFields {
        /// Zero-based position of the line in the cart
        index: usize,
    },

    /// Quantities must be positive
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity {
        /// The rejected quantity
        quantity: i64,
    },

    /// Prices must be positive and finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// A pharmacy order was placed without naming the supplying institute
    #[error("A recipient institute is required for {transaction_type} orders")]
    MissingRecipient {
        /// Channel that requires a recipient
        transaction_type: TransactionType,
    },

    /// The named recipient exists but is not an institute
    #[error("Recipient {recipient_id} is not an institute")]
    RecipientNotAnInstitute {
        /// The rejected recipient account
        recipient_id: i64,
    },

    /// A buyer tried to order a drug they own
    #[error("Drug {drug_id} belongs to the buyer and cannot be ordered")]
    SelfPurchase {
        /// The drug in question
        drug_id: i64,
    },

    /// Referenced drug does not exist (or is not offered by the recipient)
    #[error("Drug not found: {drug_id}")]
    DrugNotFound {
        /// The missing drug
        drug_id: i64,
    },

    /// Referenced order does not exist or is not visible to the caller
    #[error("Order not found: {order_id}")]
    OrderNotFound {
        /// The missing order
        order_id: i64,
    },

    /// Referenced item does not exist or is not visible to the caller
    #[error("Order item not found: {item_id}")]
    ItemNotFound {
        /// The missing item
        item_id: i64,
    },

    /// Referenced account does not exist
    #[error("Account not found: {account}")]
    AccountNotFound {
        /// Account id or external handle
        account: String,
    },

    /// The requested edge is not in the transition table
    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition {
        /// Current status
        from: ItemStatus,
        /// Requested status
        to: ItemStatus,
    },

    /// Quantity edits are only allowed while an item is pending
    #[error("Cannot edit an item with status {status}")]
    IllegalEdit {
        /// Current status
        status: ItemStatus,
    },

    /// The item changed between read and write
    #[error("Order item {item_id} was modified concurrently")]
    ConcurrentModification {
        /// The contested item
        item_id: i64,
    },

    /// Stock cannot cover the requested quantity
    #[error("Insufficient stock for drug {drug_id}: available {available}, requested {requested}")]
    InsufficientStock {
        /// The drug in question
        drug_id: i64,
        /// Stock at the time of the check
        available: i64,
        /// Requested quantity
        requested: i64,
    },

    /// The caller lacks the role or ownership for the operation
    #[error("Not authorized: {reason}")]
    Unauthorized {
        /// What check failed
        reason: String,
    },

    /// An account with an unexpected role attempted an operation
    #[error("Role {role} cannot {action}")]
    RoleNotPermitted {
        /// Caller role
        role: Role,
        /// Attempted action
        action: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Every generated order number was already taken
    #[error("Could not allocate a unique order number after {attempts} attempts, please retry")]
    OrderNumberExhausted {
        /// Candidates tried
        attempts: usize,
    },

    /// String formatting error
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Serenity/Poise framework error
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl Error {
    /// Classifies the error for callers that only care about its category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidItemsList { .. }
            | Self::InvalidTransactionType { .. }
            | Self::InvalidStatus { .. }
            | Self::MissingManufacturerFields { .. }
            | Self::InvalidQuantity { .. }
            | Self::InvalidAmount { .. }
            | Self::MissingRecipient { .. }
            | Self::RecipientNotAnInstitute { .. }
            | Self::SelfPurchase { .. } => ErrorKind::Validation,
            Self::DrugNotFound { .. }
            | Self::OrderNotFound { .. }
            | Self::ItemNotFound { .. }
            | Self::AccountNotFound { .. } => ErrorKind::NotFound,
            Self::IllegalTransition { .. }
            | Self::IllegalEdit { .. }
            | Self::ConcurrentModification { .. }
            | Self::InsufficientStock { .. }
            | Self::OrderNumberExhausted { .. } => ErrorKind::Conflict,
            Self::Unauthorized { .. } | Self::RoleNotPermitted { .. } => ErrorKind::Authorization,
            Self::Database(_) => ErrorKind::Storage,
            Self::Config { .. }
            | Self::Io(_)
            | Self::EnvVar(_)
            | Self::Fmt(_)
            | Self::Framework(_) => ErrorKind::Internal,
        }
    }

    /// Whether the state changed under the caller (or the request contradicts it).
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict)
    }

    /// Whether the message is meant for the caller rather than the operator log.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Storage | ErrorKind::Internal)
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
