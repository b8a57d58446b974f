//! Account entity - A ledger account with a running balance.
//!
//! The balance is stored in minor units (cents) and is only ever changed
//! together with a journal write inside one database transaction.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Unique identifier for the account
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user, if the account has been linked to one
    pub owner_id: Option<i64>,
    /// Product type shown to the customer (e.g., "Checking", "Savings")
    pub account_type: String,
    /// ISO currency code
    pub currency: String,
    /// Current balance in minor units
    pub balance: i64,
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Account and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One account has many journal entries
    #[sea_orm(has_many = "super::journal_entry::Entity")]
    JournalEntries,
}

impl Related<super::journal_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JournalEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
