//! Single-leg postings - One journal entry with its matching balance change.
//!
//! Used for deposits, withdrawals and opening balances. Transfer legs are not
//! accepted here; they are only ever written in pairs by
//! [`crate::core::transfer`].

use crate::{
    core::{
        deadline,
        journal::{self, NewEntry},
        ledger, money,
    },
    entities::{EntryType, journal_entry},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use tracing::{info, instrument};

/// Parameters of a single-leg posting.
#[derive(Debug, Clone)]
pub struct PostingRequest {
    pub account_id: i64,
    /// Positive amount; the sign is taken from `entry_type`
    pub amount: Decimal,
    /// `Debit` or `Credit`
    pub entry_type: EntryType,
    pub description: String,
    pub counterparty: String,
}

/// A committed posting together with the balance it left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedEntry {
    /// The journal row written for the posting
    pub entry: journal_entry::Model,
    /// Account balance in minor units right after the posting
    pub balance: i64,
}

/// Posts a debit or credit to one account atomically.
///
/// A debit is refused with [`Error::InsufficientFunds`] when the balance does
/// not cover it. The returned balance is read inside the posting transaction.
#[instrument(skip(db, request), fields(account_id = request.account_id, entry_type = ?request.entry_type))]
pub async fn post_entry(db: &DatabaseConnection, request: PostingRequest) -> Result<PostedEntry> {
    let txn = db.begin().await?;
    let posted = apply_entry(&txn, request).await?;
    deadline::commit(txn).await?;

    info!(entry_id = posted.entry.id, balance = posted.balance, "Posting committed");
    Ok(posted)
}

/// Writes a posting on a connection the caller already holds, usually an
/// open transaction the caller commits.
///
/// The balance update is the first statement, so two postings to one account
/// queue on its write lock.
pub async fn apply_entry<C>(db: &C, request: PostingRequest) -> Result<PostedEntry>
where
    C: ConnectionTrait,
{
    let amount = money::positive_minor_units(request.amount)?;
    let (signed, balance) = match request.entry_type {
        EntryType::Credit => (amount, ledger::adjust_balance(db, request.account_id, amount).await?),
        EntryType::Debit => (-amount, ledger::debit_or_refuse(db, request.account_id, amount).await?),
        EntryType::TransferOut | EntryType::TransferIn => {
            return Err(Error::InvalidRequest {
                message: "transfer entries can only be created by a transfer".to_string(),
            });
        }
    };

    let entry = journal::append(
        db,
        NewEntry {
            account_id: request.account_id,
            amount: signed,
            entry_type: request.entry_type,
            description: request.description,
            counterparty: request.counterparty,
        },
    )
    .await?;

    Ok(PostedEntry { entry, balance })
}
