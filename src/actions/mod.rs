//! Action layer - The boundary the agent gateway invokes.
//!
//! Requests arrive as `operation`-tagged JSON with camelCase parameters, are
//! dispatched to the core, and always come back as an [`ActionResponse`]:
//! success, business rejection, or failure, each with a message that can be
//! shown to the end user verbatim. How the gateway maps these to its own
//! transport status codes is not this crate's concern.

/// Account, transfer and journal actions
pub mod banking;
/// Seat availability and purchase actions
pub mod tickets;

use crate::{
    core::deadline,
    errors::{Error, ErrorKind},
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

pub use banking::{AccountParams, HistoryParams, OwnerParams, PostEntryParams, TransferParams};
pub use tickets::PurchaseParams;

/// One invocation from the gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum ActionRequest {
    Transfer(TransferParams),
    Purchase(PurchaseParams),
    PostEntry(PostEntryParams),
    GetBalance(AccountParams),
    ListAccounts(OwnerParams),
    RecentTransactions(HistoryParams),
    AvailableSeats,
}

impl ActionRequest {
    /// Operation name used in logs.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Transfer(_) => "transfer",
            Self::Purchase(_) => "purchase",
            Self::PostEntry(_) => "post_entry",
            Self::GetBalance(_) => "get_balance",
            Self::ListAccounts(_) => "list_accounts",
            Self::RecentTransactions(_) => "recent_transactions",
            Self::AvailableSeats => "available_seats",
        }
    }
}

/// Top-level outcome of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// The action ran and any writes are committed
    Success,
    /// A business rule turned the request down; nothing was written
    Rejected,
    /// Invalid input, a storage error or a timeout
    Failed,
}

/// Structured result of one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    /// Success, rejection or failure
    pub status: ActionStatus,
    /// Machine-readable category for rejections and failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    /// Whether resubmitting the same request is safe and may succeed
    pub retryable: bool,
    /// Human-readable text for the end user
    pub message: String,
    /// Structured payload: the operation result, or the amounts of a refused debit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ActionResponse {
    /// Response for an action that ran to completion.
    #[must_use]
    pub const fn success(message: String, data: Option<serde_json::Value>) -> Self {
        Self {
            status: ActionStatus::Success,
            kind: None,
            retryable: false,
            message,
            data,
        }
    }

    /// Response for a business-rule refusal. Rejections are never retryable.
    #[must_use]
    pub const fn rejected(kind: ErrorKind, message: String, data: Option<serde_json::Value>) -> Self {
        Self {
            status: ActionStatus::Rejected,
            kind: Some(kind),
            retryable: false,
            message,
            data,
        }
    }

    /// Converts an error into a rejection or failure response.
    #[must_use]
    pub fn from_error(err: &Error) -> Self {
        if err.is_rejection() {
            let data = match err {
                Error::InsufficientFunds { current, required } => Some(serde_json::json!({
                    "currentBalance": current,
                    "requestedAmount": required,
                })),
                _ => None,
            };
            return Self::rejected(err.kind(), err.user_message(), data);
        }

        Self {
            status: ActionStatus::Failed,
            kind: Some(err.kind()),
            retryable: err.is_retryable(),
            message: err.user_message(),
            data: None,
        }
    }
}

/// Runs one action under a deadline.
///
/// If the deadline passes before the action starts to commit, the in-flight
/// work is dropped together with its open database transaction, which rolls
/// back, and the caller gets a retryable [`Error::Timeout`] response. An action
/// already committing is waited for, so a timeout never hides applied work.
#[instrument(skip(db, request), fields(operation = request.operation()))]
pub async fn handle(
    db: &DatabaseConnection,
    request: ActionRequest,
    deadline: Duration,
) -> ActionResponse {
    let outcome = deadline::with_deadline(deadline, dispatch(db, request)).await;

    match outcome {
        Ok(response) => {
            info!(status = ?response.status, "Action completed");
            response
        }
        Err(err) => {
            if err.is_rejection() {
                info!(error = %err, "Action rejected");
            } else if err.is_retryable() {
                warn!(error = %err, "Action failed, safe to retry");
            } else {
                error!(error = %err, "Action failed");
            }
            ActionResponse::from_error(&err)
        }
    }
}

/// Parses a raw JSON request and runs it with [`handle`].
pub async fn handle_json(db: &DatabaseConnection, raw: &str, deadline: Duration) -> ActionResponse {
    match serde_json::from_str::<ActionRequest>(raw) {
        Ok(request) => handle(db, request, deadline).await,
        Err(e) => {
            warn!(error = %e, "Malformed action request");
            ActionResponse::from_error(&Error::InvalidRequest {
                message: format!("malformed request ({e})"),
            })
        }
    }
}

async fn dispatch(db: &DatabaseConnection, request: ActionRequest) -> crate::errors::Result<ActionResponse> {
    match request {
        ActionRequest::Transfer(params) => banking::transfer(db, params).await,
        ActionRequest::Purchase(params) => tickets::purchase(db, params).await,
        ActionRequest::PostEntry(params) => banking::post_entry(db, params).await,
        ActionRequest::GetBalance(params) => banking::get_balance(db, params).await,
        ActionRequest::ListAccounts(params) => banking::list_accounts(db, params).await,
        ActionRequest::RecentTransactions(params) => {
            banking::recent_transactions(db, params).await
        }
        ActionRequest::AvailableSeats => tickets::available_seats(db).await,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{inventory, journal, ledger};
    use crate::entities::{EntryType, TicketSale};
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, TransactionTrait};

    const DEADLINE: Duration = Duration::from_secs(5);

    #[test]
    fn test_parse_transfer_request() {
        let raw = r#"{
            "operation": "transfer",
            "fromAccountId": 1,
            "toAccountId": 2,
            "amount": "40.00",
            "idempotencyKey": "abc"
        }"#;
        let ActionRequest::Transfer(params) = serde_json::from_str(raw).unwrap() else {
            panic!("expected a transfer");
        };
        assert_eq!(params.from_account_id, 1);
        assert_eq!(params.to_account_id, 2);
        assert_eq!(params.amount, dec!(40.00));
        assert_eq!(params.description, None);
        assert_eq!(params.idempotency_key.as_deref(), Some("abc"));
    }

    #[test]
    fn test_parse_unit_operation() {
        let request: ActionRequest =
            serde_json::from_str(r#"{"operation": "available_seats"}"#).unwrap();
        assert!(matches!(request, ActionRequest::AvailableSeats));
    }

    #[tokio::test]
    async fn test_malformed_request_is_invalid_request() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;

        let response = handle_json(&db, r#"{"operation": "teleport"}"#, DEADLINE).await;
        assert_eq!(response.status, ActionStatus::Failed);
        assert_eq!(response.kind, Some(ErrorKind::InvalidRequest));
        assert!(!response.retryable);
        Ok(())
    }

    #[tokio::test]
    async fn test_insufficient_funds_is_rejected_with_amounts() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_account(&db, dec!(10.00)).await?;
        let b = create_test_account(&db, dec!(0)).await?;

        let raw = format!(
            r#"{{"operation": "transfer", "fromAccountId": {}, "toAccountId": {}, "amount": 40}}"#,
            a.id, b.id
        );
        let response = handle_json(&db, &raw, DEADLINE).await;

        assert_eq!(response.status, ActionStatus::Rejected);
        assert_eq!(response.kind, Some(ErrorKind::InsufficientFunds));
        assert!(response.message.contains("$10.00"));
        assert!(response.message.contains("$40.00"));
        assert!(response.data.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_storage_failure_is_retryable() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;
        db.execute_unprepared("DROP TABLE accounts").await?;

        let response = handle(
            &db,
            ActionRequest::GetBalance(AccountParams { account_id: 1 }),
            DEADLINE,
        )
        .await;
        assert_eq!(response.status, ActionStatus::Failed);
        assert_eq!(response.kind, Some(ErrorKind::Storage));
        assert!(response.retryable);
        Ok(())
    }

    #[test]
    fn test_response_serialization_omits_empty_fields() {
        let response = ActionResponse::success("ok".to_string(), None);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({"status": "success", "retryable": false, "message": "ok"}));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_timeout_while_store_is_busy_changes_nothing() -> crate::errors::Result<()> {
        let (db, dir) = setup_file_test_db(4).await?;
        let a = create_test_account(&db, dec!(100.00)).await?;
        let b = create_test_account(&db, dec!(0)).await?;
        create_test_section(&db, 5, 3, dec!(20.00)).await?;

        // Another writer holds the database write lock past the deadline
        let writer = db.begin().await?;
        writer
            .execute_unprepared("UPDATE seat_sections SET capacity = capacity")
            .await?;

        let short = Duration::from_millis(200);
        let transfer = handle(
            &db,
            ActionRequest::Transfer(TransferParams {
                from_account_id: a.id,
                to_account_id: b.id,
                amount: dec!(40.00),
                description: None,
                idempotency_key: None,
            }),
            short,
        )
        .await;
        let purchase = handle(
            &db,
            ActionRequest::Purchase(PurchaseParams {
                section_number: 5,
                seat_count: 2,
                purchaser_name: "Ada Lovelace".to_string(),
                purchaser_phone: String::new(),
                purchaser_email: String::new(),
                idempotency_key: None,
            }),
            short,
        )
        .await;
        writer.rollback().await?;

        for response in [&transfer, &purchase] {
            assert_eq!(response.status, ActionStatus::Failed);
            assert_eq!(response.kind, Some(ErrorKind::Timeout));
            assert!(response.retryable);
        }

        // Fresh pool, so nothing reads through an abandoned connection
        let observer = connect_file_test_db(&dir, 1).await?;
        assert_eq!(ledger::get_balance(&observer, a.id).await?, dec!(100.00));
        assert_eq!(ledger::get_balance(&observer, b.id).await?, dec!(0));
        assert_eq!(journal::entry_count(&observer, a.id).await?, 1);
        assert_eq!(inventory::get_availability(&observer, 5).await?.available_seats, 3);
        assert_eq!(TicketSale::find().count(&observer).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_timed_out_posting_was_never_applied() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;
        let account = create_test_account(&db, dec!(50.00)).await?;

        for micros in (0..400).step_by(4) {
            let before = journal::entry_count(&db, account.id).await?;
            let response = handle(
                &db,
                ActionRequest::PostEntry(PostEntryParams {
                    account_id: account.id,
                    amount: dec!(1.00),
                    transaction_type: EntryType::Credit,
                    description: None,
                    related_party: None,
                }),
                Duration::from_micros(micros),
            )
            .await;
            let after = journal::entry_count(&db, account.id).await?;

            match response.status {
                ActionStatus::Success => assert_eq!(after, before + 1),
                ActionStatus::Failed => {
                    assert_eq!(response.kind, Some(ErrorKind::Timeout));
                    assert_eq!(after, before, "timed out at {micros}us but the entry exists");
                }
                ActionStatus::Rejected => panic!("unexpected rejection: {}", response.message),
            }
        }

        let stored = ledger::get_account(&db, account.id).await?.balance;
        assert_eq!(stored, journal::journal_total(&db, account.id).await?);
        Ok(())
    }
}
