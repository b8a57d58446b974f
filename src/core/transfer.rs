//! Transfer orchestrator - Two-leg atomic fund transfers.
//!
//! A transfer debits one account and credits another inside a single database
//! transaction: the guarded debit checks and moves the source balance in one
//! statement, the destination is credited, and one journal entry is appended
//! per leg. Any failure after the transaction begins drops it, which rolls
//! every write back, so no partial leg is ever visible.

use crate::{
    core::{
        deadline, idempotency,
        journal::{self, NewEntry},
        ledger, money,
    },
    entities::EntryType,
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Operation name recorded with idempotency keys.
pub const OPERATION: &str = "transfer";

/// Used when the caller supplies no description.
pub const DEFAULT_DESCRIPTION: &str = "Account transfer";

/// Parameters of a transfer request.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub from_account_id: i64,
    pub to_account_id: i64,
    /// Strictly positive, at most two fractional digits
    pub amount: Decimal,
    pub description: Option<String>,
    /// Optional caller-supplied deduplication token
    pub idempotency_key: Option<String>,
}

/// Result of a committed transfer. Only produced once both legs committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    /// Journal entry of the `TransferOut` leg
    pub debit_entry_id: i64,
    /// Journal entry of the `TransferIn` leg
    pub credit_entry_id: i64,
    pub amount: Decimal,
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub description: String,
}

/// Moves `amount` from one account to another.
///
/// Self-transfers are allowed: they write both legs and leave the balance
/// unchanged.
///
/// # Errors
/// * [`Error::InvalidAmount`] - amount not strictly positive or finer than a cent
/// * [`Error::AccountNotFound`] - source or destination missing
/// * [`Error::InsufficientFunds`] - source balance below the amount
/// * [`Error::Database`] - retryable, nothing applied
#[instrument(
    skip(db, request),
    fields(
        from = request.from_account_id,
        to = request.to_account_id,
        amount = %request.amount,
    )
)]
pub async fn transfer(db: &DatabaseConnection, request: TransferRequest) -> Result<TransferResult> {
    let amount = money::positive_minor_units(request.amount)?;
    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_DESCRIPTION)
        .to_string();

    if let Some(key) = request.idempotency_key.as_deref() {
        idempotency::validate_key(key)?;
        if let Some(previous) = idempotency::lookup::<TransferResult, _>(db, key, OPERATION).await? {
            info!(key, "Transfer already applied, returning original result");
            return Ok(previous);
        }
    }

    match execute(db, &request, amount, description).await {
        Err(err) if idempotency::is_duplicate_key(&err) => {
            let Some(key) = request.idempotency_key.as_deref() else {
                return Err(err);
            };
            warn!(key, "Concurrent transfer with the same key, returning winner's result");
            idempotency::resolve_duplicate(db, key, OPERATION, err).await
        }
        other => other,
    }
}

async fn execute(
    db: &DatabaseConnection,
    request: &TransferRequest,
    amount: i64,
    description: String,
) -> Result<TransferResult> {
    let from = request.from_account_id;
    let to = request.to_account_id;

    let txn = db.begin().await?;
    ledger::lock_accounts(&txn, &[from, to]).await?;

    // The guarded debit is the first write, so concurrent transfers out of the
    // same account queue on it and each sees the committed balance.
    ledger::debit_or_refuse(&txn, from, amount).await?;
    ledger::adjust_balance(&txn, to, amount).await?;

    let debit = journal::append(
        &txn,
        NewEntry {
            account_id: from,
            amount: -amount,
            entry_type: EntryType::TransferOut,
            description: description.clone(),
            counterparty: format!("Transfer to Account {to}"),
        },
    )
    .await?;

    let credit = journal::append(
        &txn,
        NewEntry {
            account_id: to,
            amount,
            entry_type: EntryType::TransferIn,
            description: description.clone(),
            counterparty: format!("Transfer from Account {from}"),
        },
    )
    .await?;

    let result = TransferResult {
        debit_entry_id: debit.id,
        credit_entry_id: credit.id,
        amount: money::from_minor_units(amount),
        from_account_id: from,
        to_account_id: to,
        description,
    };

    if let Some(key) = request.idempotency_key.as_deref() {
        idempotency::record(&txn, key, OPERATION, &result).await?;
    }

    deadline::commit(txn).await?;
    info!(
        debit_entry_id = result.debit_entry_id,
        credit_entry_id = result.credit_entry_id,
        "Transfer committed"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::JournalEntry;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use sea_orm::{
        ConnectionTrait, DatabaseBackend, EntityTrait, MockDatabase, PaginatorTrait,
    };
    use std::sync::Arc;

    fn request(from: i64, to: i64, amount: Decimal) -> TransferRequest {
        TransferRequest {
            from_account_id: from,
            to_account_id: to,
            amount,
            description: Some("Rent share".to_string()),
            idempotency_key: None,
        }
    }

    async fn total_entries(db: &DatabaseConnection) -> Result<u64> {
        Ok(JournalEntry::find().count(db).await?)
    }

    #[tokio::test]
    async fn test_transfer_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        for amount in [dec!(0), dec!(-40.00), dec!(0.001)] {
            let result = transfer(&db, request(1, 2, amount)).await;
            assert!(matches!(
                result.unwrap_err(),
                Error::InvalidAmount { amount: a } if a == amount
            ));
        }

        let mut blank_key = request(1, 2, dec!(1));
        blank_key.idempotency_key = Some(" ".to_string());
        assert!(matches!(
            transfer(&db, blank_key).await.unwrap_err(),
            Error::InvalidRequest { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_moves_funds_and_writes_two_legs() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_account(&db, dec!(100.00)).await?;
        let b = create_test_account(&db, dec!(10.00)).await?;
        let entries_before = total_entries(&db).await?;

        let result = transfer(&db, request(a.id, b.id, dec!(40.00))).await?;

        assert_eq!(result.amount, dec!(40.00));
        assert_eq!(result.from_account_id, a.id);
        assert_eq!(result.to_account_id, b.id);
        assert_eq!(ledger::get_balance(&db, a.id).await?, dec!(60.00));
        assert_eq!(ledger::get_balance(&db, b.id).await?, dec!(50.00));
        assert_eq!(total_entries(&db).await?, entries_before + 2);

        let debit = JournalEntry::find_by_id(result.debit_entry_id)
            .one(&db)
            .await?
            .unwrap();
        assert_eq!(debit.account_id, a.id);
        assert_eq!(debit.amount, -4000);
        assert_eq!(debit.entry_type, EntryType::TransferOut);
        assert_eq!(debit.counterparty, format!("Transfer to Account {}", b.id));
        assert_eq!(debit.description, "Rent share");

        let credit = JournalEntry::find_by_id(result.credit_entry_id)
            .one(&db)
            .await?
            .unwrap();
        assert_eq!(credit.account_id, b.id);
        assert_eq!(credit.amount, 4000);
        assert_eq!(credit.entry_type, EntryType::TransferIn);
        assert_eq!(credit.counterparty, format!("Transfer from Account {}", a.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_conserves_total_and_reconciles_journal() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_account(&db, dec!(250.00)).await?;
        let b = create_test_account(&db, dec!(5.55)).await?;

        for amount in [dec!(10.00), dec!(0.45), dec!(99.99)] {
            transfer(&db, request(a.id, b.id, amount)).await?;
        }
        transfer(&db, request(b.id, a.id, dec!(3.00))).await?;

        let total = ledger::get_balance(&db, a.id).await? + ledger::get_balance(&db, b.id).await?;
        assert_eq!(total, dec!(255.55));

        for account_id in [a.id, b.id] {
            let stored = ledger::get_account(&db, account_id).await?.balance;
            assert_eq!(stored, journal::journal_total(&db, account_id).await?);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_insufficient_funds_changes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_account(&db, dec!(10.00)).await?;
        let b = create_test_account(&db, dec!(0)).await?;
        let entries_before = total_entries(&db).await?;

        let result = transfer(&db, request(a.id, b.id, dec!(40.00))).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientFunds { current, required }
                if current == dec!(10.00) && required == dec!(40.00)
        ));

        assert_eq!(ledger::get_balance(&db, a.id).await?, dec!(10.00));
        assert_eq!(ledger::get_balance(&db, b.id).await?, dec!(0));
        assert_eq!(total_entries(&db).await?, entries_before);
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_missing_accounts() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_account(&db, dec!(10.00)).await?;

        let missing_source = transfer(&db, request(999, a.id, dec!(1.00))).await;
        assert!(matches!(
            missing_source.unwrap_err(),
            Error::AccountNotFound { account_id: 999 }
        ));

        let missing_destination = transfer(&db, request(a.id, 998, dec!(1.00))).await;
        assert!(matches!(
            missing_destination.unwrap_err(),
            Error::AccountNotFound { account_id: 998 }
        ));
        assert_eq!(ledger::get_balance(&db, a.id).await?, dec!(10.00));
        Ok(())
    }

    #[tokio::test]
    async fn test_self_transfer_is_net_zero_with_two_entries() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_account(&db, dec!(20.00)).await?;
        let count_before = journal::entry_count(&db, a.id).await?;

        let result = transfer(&db, request(a.id, a.id, dec!(15.00))).await?;

        assert_ne!(result.debit_entry_id, result.credit_entry_id);
        assert_eq!(ledger::get_balance(&db, a.id).await?, dec!(20.00));
        assert_eq!(journal::entry_count(&db, a.id).await?, count_before + 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_default_description() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_account(&db, dec!(5.00)).await?;
        let b = create_test_account(&db, dec!(0)).await?;

        let mut req = request(a.id, b.id, dec!(1.00));
        req.description = Some("   ".to_string());
        let result = transfer(&db, req).await?;
        assert_eq!(result.description, DEFAULT_DESCRIPTION);
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_rolls_back_when_journal_write_fails() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_account(&db, dec!(100.00)).await?;
        let b = create_test_account(&db, dec!(10.00)).await?;

        db.execute_unprepared("DROP TABLE journal_entries").await?;

        let err = transfer(&db, request(a.id, b.id, dec!(40.00)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert!(err.is_retryable());

        assert_eq!(ledger::get_balance(&db, a.id).await?, dec!(100.00));
        assert_eq!(ledger::get_balance(&db, b.id).await?, dec!(10.00));
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_rolls_back_when_final_write_fails() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_account(&db, dec!(100.00)).await?;
        let b = create_test_account(&db, dec!(10.00)).await?;

        // The key record is the last write of the unit
        db.execute_unprepared("DROP TABLE idempotency_records").await?;

        let mut req = request(a.id, b.id, dec!(40.00));
        req.idempotency_key = Some("late-failure".to_string());
        assert!(transfer(&db, req).await.is_err());

        assert_eq!(ledger::get_balance(&db, a.id).await?, dec!(100.00));
        assert_eq!(ledger::get_balance(&db, b.id).await?, dec!(10.00));
        // Opening balance only
        assert_eq!(journal::entry_count(&db, a.id).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_with_key_is_applied_once() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_account(&db, dec!(100.00)).await?;
        let b = create_test_account(&db, dec!(0)).await?;

        let mut req = request(a.id, b.id, dec!(40.00));
        req.idempotency_key = Some("retry-me".to_string());

        let first = transfer(&db, req.clone()).await?;
        let entries_after_first = total_entries(&db).await?;
        let second = transfer(&db, req).await?;

        assert_eq!(first, second);
        assert_eq!(total_entries(&db).await?, entries_after_first);
        assert_eq!(ledger::get_balance(&db, a.id).await?, dec!(60.00));
        assert_eq!(ledger::get_balance(&db, b.id).await?, dec!(40.00));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transfers_never_overdraw() -> Result<()> {
        let (db, _dir) = setup_file_test_db(8).await?;
        let a = create_test_account(&db, dec!(100.00)).await?;
        let b = create_test_account(&db, dec!(0)).await?;
        let db = Arc::new(db);

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..10 {
            let db = Arc::clone(&db);
            let req = request(a.id, b.id, dec!(30.00));
            tasks.spawn(async move { transfer(&db, req).await });
        }

        let mut succeeded = 0;
        let mut rejected = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined.unwrap() {
                Ok(_) => succeeded += 1,
                Err(Error::InsufficientFunds { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(succeeded, 3);
        assert_eq!(rejected, 7);
        assert_eq!(ledger::get_balance(db.as_ref(), a.id).await?, dec!(10.00));
        assert_eq!(ledger::get_balance(db.as_ref(), b.id).await?, dec!(90.00));
        assert_eq!(journal::journal_total(db.as_ref(), a.id).await?, 1000);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_opposite_transfers_on_file_database_all_apply() -> Result<()> {
        let (db, _dir) = setup_file_test_db(8).await?;
        let a = create_test_account(&db, dec!(50.00)).await?;
        let b = create_test_account(&db, dec!(50.00)).await?;
        let db = Arc::new(db);

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8 {
            let db = Arc::clone(&db);
            let req = if i % 2 == 0 {
                request(a.id, b.id, dec!(5.00))
            } else {
                request(b.id, a.id, dec!(5.00))
            };
            tasks.spawn(async move { transfer(&db, req).await });
        }

        while let Some(joined) = tasks.join_next().await {
            joined.unwrap()?;
        }

        assert_eq!(ledger::get_balance(db.as_ref(), a.id).await?, dec!(50.00));
        assert_eq!(ledger::get_balance(db.as_ref(), b.id).await?, dec!(50.00));
        assert_eq!(journal::entry_count(db.as_ref(), a.id).await?, 9);
        Ok(())
    }
}
