//! Transaction journal - Append-only record of balance-affecting events.
//!
//! Entries are inserted once and never updated or deleted. The sum of an
//! account's entries is the source of truth its stored balance must match.

use crate::{
    entities::{JournalEntry, journal_entry},
    errors::Result,
};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use tracing::{debug, instrument};

/// Default number of entries returned by [`recent_entries`].
pub const DEFAULT_HISTORY_LIMIT: u64 = 100;
/// Upper bound on the number of entries returned by [`recent_entries`].
pub const MAX_HISTORY_LIMIT: u64 = 500;

/// A journal entry that has not been written yet.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub account_id: i64,
    /// Signed amount in minor units
    pub amount: i64,
    pub entry_type: journal_entry::EntryType,
    pub description: String,
    pub counterparty: String,
}

/// Appends an immutable entry and returns it with its assigned id.
#[instrument(skip(db, entry), fields(account_id = entry.account_id, entry_type = ?entry.entry_type))]
pub async fn append<C>(db: &C, entry: NewEntry) -> Result<journal_entry::Model>
where
    C: ConnectionTrait,
{
    let model = journal_entry::ActiveModel {
        account_id: Set(entry.account_id),
        amount: Set(entry.amount),
        entry_type: Set(entry.entry_type),
        description: Set(entry.description),
        counterparty: Set(entry.counterparty),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let inserted = model.insert(db).await?;
    debug!(entry_id = inserted.id, amount = inserted.amount, "Journal entry appended");
    Ok(inserted)
}

/// Returns an account's most recent entries, newest first.
///
/// `limit` defaults to [`DEFAULT_HISTORY_LIMIT`] and is capped at
/// [`MAX_HISTORY_LIMIT`]. Entries written in the same instant are ordered by id.
pub async fn recent_entries<C>(
    db: &C,
    account_id: i64,
    limit: Option<u64>,
) -> Result<Vec<journal_entry::Model>>
where
    C: ConnectionTrait,
{
    let limit = limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    JournalEntry::find()
        .filter(journal_entry::Column::AccountId.eq(account_id))
        .order_by_desc(journal_entry::Column::CreatedAt)
        .order_by_desc(journal_entry::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sum of all committed entries for an account, in minor units.
pub async fn journal_total<C>(db: &C, account_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    let amounts: Vec<i64> = JournalEntry::find()
        .select_only()
        .column(journal_entry::Column::Amount)
        .filter(journal_entry::Column::AccountId.eq(account_id))
        .into_tuple()
        .all(db)
        .await?;

    Ok(amounts.iter().sum())
}

/// Number of entries recorded for an account.
pub async fn entry_count<C>(db: &C, account_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    JournalEntry::find()
        .filter(journal_entry::Column::AccountId.eq(account_id))
        .count(db)
        .await
        .map_err(Into::into)
}
