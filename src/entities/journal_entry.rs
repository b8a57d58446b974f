//! Journal entry entity - One immutable balance-affecting event.
//!
//! Entries are appended once and never updated or deleted. A transfer writes
//! exactly two of them, one per leg.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Journal entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "journal_entries")]
pub struct Model {
    /// Assigned on insert, increasing
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Account whose balance this entry affects
    pub account_id: i64,
    /// Signed amount in minor units (negative for money leaving the account)
    pub amount: i64,
    pub entry_type: EntryType,
    pub description: String,
    /// Free-form label for the other side, e.g. `"Transfer to Account 2"`
    pub counterparty: String,
    pub created_at: DateTimeUtc,
}

/// Kind of balance-affecting event
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum EntryType {
    #[sea_orm(string_value = "Debit")]
    Debit,
    #[sea_orm(string_value = "Credit")]
    Credit,
    #[sea_orm(string_value = "Transfer Out")]
    TransferOut,
    #[sea_orm(string_value = "Transfer In")]
    TransferIn,
}

impl EntryType {
    /// Label used in history listings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Debit => "Debit",
            Self::Credit => "Credit",
            Self::TransferOut => "Transfer Out",
            Self::TransferIn => "Transfer In",
        }
    }
}

/// Defines relationships between JournalEntry and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one account
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
