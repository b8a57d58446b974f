//! Unified error types and result handling.
//!
//! Every failure the core can report is a variant of [`Error`]. Callers at the
//! action boundary use [`Error::kind`] for the machine-readable category,
//! [`Error::is_retryable`] to decide whether a resubmit is safe, and
//! [`Error::user_message`] for text that can be shown to an end user.

use rust_decimal::Decimal;
use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;

use crate::core::money;

/// All errors produced by the mutation core and its ambient layers.
#[derive(Debug, Error)]
pub enum Error {
    /// Amount is zero, negative, or has more precision than the currency allows
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The amount as the caller supplied it
        amount: Decimal,
    },

    /// Caller input violates a precondition other than the amount
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What was wrong with the request
        message: String,
    },

    /// No account row has this id
    #[error("Account not found: {account_id}")]
    AccountNotFound { account_id: i64 },

    /// No seat section has this number
    #[error("Section not found: {section_number}")]
    SectionNotFound { section_number: i32 },

    /// Source account balance does not cover the requested debit
    #[error("Insufficient funds: current balance {current}, required {required}")]
    InsufficientFunds {
        /// Balance at the time of the check
        current: Decimal,
        /// Amount the operation needed
        required: Decimal,
    },

    /// Section exists but has fewer seats than requested
    #[error("Insufficient inventory in section {section_number}: requested {requested}")]
    InsufficientInventory {
        section_number: i32,
        requested: i32,
    },

    /// A guarded write found the row changed after its check
    #[error("Concurrency conflict: {message}")]
    ConcurrencyConflict { message: String },

    /// The invocation did not finish within its deadline
    #[error("Operation timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// The store failed or was unreachable
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Settings or a provisioning file could not be read or parsed
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Reading the request or writing the response failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An environment variable was present but not valid unicode
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// A request, response or stored result could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Machine-readable error category reported at the action boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`Error::InvalidAmount`]
    InvalidAmount,
    /// Malformed JSON or a violated precondition
    InvalidRequest,
    /// See [`Error::AccountNotFound`]
    AccountNotFound,
    /// See [`Error::SectionNotFound`]
    SectionNotFound,
    /// See [`Error::InsufficientFunds`]
    InsufficientFunds,
    /// Too few seats left, or no such section, on a purchase
    SoldOut,
    /// See [`Error::ConcurrencyConflict`]
    ConcurrencyConflict,
    /// The deadline passed before the work was committed
    Timeout,
    /// The store failed; resubmitting may succeed
    Storage,
    /// Configuration, I/O, environment or serialization failure
    Internal,
}

impl Error {
    /// Returns the machine-readable category for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::AccountNotFound { .. } => ErrorKind::AccountNotFound,
            Self::SectionNotFound { .. } => ErrorKind::SectionNotFound,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::InsufficientInventory { .. } => ErrorKind::SoldOut,
            Self::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Database(_) => ErrorKind::Storage,
            Self::Config { .. } | Self::Io(_) | Self::EnvVar(_) | Self::Serialization(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether the caller may safely resubmit the same request.
    ///
    /// Only faults that happen inside an atomic unit qualify: the unit rolled
    /// back, so nothing was applied.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict { .. } | Self::Timeout { .. } | Self::Database(_)
        )
    }

    /// Whether this is a business-rule rejection rather than a fault.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds { .. } | Self::InsufficientInventory { .. }
        )
    }

    /// Renders a message suitable for direct display to an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidAmount { amount } => {
                format!("The amount {amount} is not valid. Amounts must be positive with at most two decimal places.")
            }
            Self::InvalidRequest { message } => format!("The request could not be processed: {message}."),
            Self::AccountNotFound { account_id } => {
                format!("No account found with account ID {account_id}.")
            }
            Self::SectionNotFound { section_number } => {
                format!("Section {section_number} does not exist.")
            }
            Self::InsufficientFunds { current, required } => format!(
                "Insufficient funds. Current balance: {}, Transfer amount: {}.",
                money::format_decimal(*current),
                money::format_decimal(*required)
            ),
            Self::InsufficientInventory { .. } => SOLD_OUT_MESSAGE.to_string(),
            Self::ConcurrencyConflict { .. } | Self::Database(_) => {
                "The request could not be completed right now and nothing was changed. Please try again.".to_string()
            }
            Self::Timeout { .. } => {
                "The request took too long and nothing was changed. Please try again.".to_string()
            }
            Self::Config { .. } | Self::Io(_) | Self::EnvVar(_) | Self::Serialization(_) => {
                "The service is not available at the moment.".to_string()
            }
        }
    }
}

/// Shown whenever a purchase cannot be served from the requested section.
pub const SOLD_OUT_MESSAGE: &str =
    "Your requested section seats are all sold out. Please choose a different section.";

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
