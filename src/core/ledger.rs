//! Ledger store - Accounts and the primitives that mutate their balances.
//!
//! Balance changes are single `UPDATE` statements computed by the database
//! (`balance = balance + delta`) so nothing is read, modified and written back
//! from application memory. These primitives take any [`ConnectionTrait`] so
//! that orchestrators can compose them inside one database transaction with the
//! matching journal write; none of them is meant to be called standalone for a
//! transfer.

use crate::{
    core::money,
    entities::{Account, account},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{DbBackend, QueryOrder, QuerySelect, Set, prelude::*, sea_query::Expr};
use tracing::{debug, instrument};

/// Parameters for provisioning a new account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Explicit id, or `None` to let the store assign one
    pub id: Option<i64>,
    pub owner_id: Option<i64>,
    pub account_type: String,
    pub currency: String,
}

/// Finds an account by id, failing with [`Error::AccountNotFound`] if it is missing.
pub async fn get_account<C>(db: &C, account_id: i64) -> Result<account::Model>
where
    C: ConnectionTrait,
{
    Account::find_by_id(account_id)
        .one(db)
        .await?
        .ok_or(Error::AccountNotFound { account_id })
}

/// Returns the current balance of an account.
#[instrument(skip(db))]
pub async fn get_balance<C>(db: &C, account_id: i64) -> Result<Decimal>
where
    C: ConnectionTrait,
{
    let account = get_account(db, account_id).await?;
    Ok(money::from_minor_units(account.balance))
}

/// Lists the accounts linked to an owner, oldest first.
pub async fn list_accounts<C>(db: &C, owner_id: i64) -> Result<Vec<account::Model>>
where
    C: ConnectionTrait,
{
    Account::find()
        .filter(account::Column::OwnerId.eq(owner_id))
        .order_by_asc(account::Column::CreatedAt)
        .order_by_asc(account::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates an account with a zero balance.
///
/// Opening balances are posted afterwards as journal entries so that the
/// balance always reconciles with the journal.
pub async fn open_account<C>(db: &C, new_account: NewAccount) -> Result<account::Model>
where
    C: ConnectionTrait,
{
    if new_account.account_type.trim().is_empty() {
        return Err(Error::InvalidRequest {
            message: "account type cannot be empty".to_string(),
        });
    }

    let currency = new_account.currency.trim().to_ascii_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::InvalidRequest {
            message: format!("'{}' is not a three-letter currency code", new_account.currency),
        });
    }

    let mut model = account::ActiveModel {
        owner_id: Set(new_account.owner_id),
        account_type: Set(new_account.account_type.trim().to_string()),
        currency: Set(currency),
        balance: Set(0),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    if let Some(id) = new_account.id {
        model.id = Set(id);
    }

    let account = model.insert(db).await?;
    debug!(account_id = account.id, "Account opened");
    Ok(account)
}

/// Row-locks the given accounts for the rest of the transaction, in ascending
/// id order.
///
/// On backends with row locks this issues `SELECT ... FOR UPDATE`, so
/// conflicting transfers queue behind each other while disjoint ones proceed.
/// Locking in id order keeps two transfers between the same pair of accounts
/// from deadlocking.
///
/// On `SQLite` nothing is issued: a read at the start of a transaction would
/// take a shared lock that cannot later be upgraded while another writer is
/// active. There the first guarded write takes the database write lock and
/// concurrent writers wait for it.
pub async fn lock_accounts<C>(db: &C, account_ids: &[i64]) -> Result<()>
where
    C: ConnectionTrait,
{
    if db.get_database_backend() == DbBackend::Sqlite {
        return Ok(());
    }

    let mut ids = account_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    Account::find()
        .filter(account::Column::Id.is_in(ids))
        .order_by_asc(account::Column::Id)
        .lock_exclusive()
        .all(db)
        .await?;
    Ok(())
}

/// Atomically adds `delta` (minor units, may be negative) to an account balance.
///
/// Performs `UPDATE accounts SET balance = balance + delta WHERE id = ?` and
/// returns the new balance in minor units.
#[instrument(skip(db))]
pub async fn adjust_balance<C>(db: &C, account_id: i64, delta: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    let result = Account::update_many()
        .col_expr(
            account::Column::Balance,
            Expr::col(account::Column::Balance).add(delta),
        )
        .filter(account::Column::Id.eq(account_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::AccountNotFound { account_id });
    }

    let account = get_account(db, account_id).await?;
    Ok(account.balance)
}

/// Subtracts `amount` (minor units) only if the balance covers it.
///
/// The coverage check is part of the `UPDATE` itself
/// (`WHERE id = ? AND balance >= amount`), so a concurrent debit can never
/// drive the balance negative. Returns whether the debit was applied.
#[instrument(skip(db))]
pub async fn debit_if_covered<C>(db: &C, account_id: i64, amount: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Account::update_many()
        .col_expr(
            account::Column::Balance,
            Expr::col(account::Column::Balance).sub(amount),
        )
        .filter(account::Column::Id.eq(account_id))
        .filter(account::Column::Balance.gte(amount))
        .exec(db)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Debits `amount` (minor units) and returns the new balance, or explains why not.
///
/// The guarded `UPDATE` runs first and the row is only read afterwards,
/// inside the same transaction, to classify a refused debit.
///
/// # Errors
/// * [`Error::AccountNotFound`] - no such account
/// * [`Error::InsufficientFunds`] - the balance does not cover `amount`
pub async fn debit_or_refuse<C>(db: &C, account_id: i64, amount: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    let applied = debit_if_covered(db, account_id, amount).await?;
    let account = get_account(db, account_id).await?;
    if !applied {
        debug!(balance = account.balance, "Debit not covered");
        return Err(Error::InsufficientFunds {
            current: money::from_minor_units(account.balance),
            required: money::from_minor_units(amount),
        });
    }
    Ok(account.balance)
}
