use crate::{
    actions::ActionResponse,
    core::{
        journal, ledger, money,
        posting::{self, PostingRequest},
        transfer::{self, TransferRequest},
    },
    entities::{EntryType, account, journal_entry},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Parameters of `transfer`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Parameters of `post_entry`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEntryParams {
    pub account_id: i64,
    pub amount: Decimal,
    /// `Debit` or `Credit`
    #[serde(default = "default_entry_type")]
    pub transaction_type: EntryType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub related_party: Option<String>,
}

const fn default_entry_type() -> EntryType {
    EntryType::Debit
}

/// Parameters of `get_balance`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountParams {
    pub account_id: i64,
}

/// Parameters of `list_accounts`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerParams {
    pub owner_id: i64,
}

/// Parameters of `recent_transactions`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    pub account_id: i64,
    /// Defaults to 100, capped at 500
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Account as reported to the gateway, with the balance in currency units.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountView {
    account_id: i64,
    owner_id: Option<i64>,
    account_type: String,
    currency: String,
    balance: Decimal,
}

impl From<account::Model> for AccountView {
    fn from(model: account::Model) -> Self {
        Self {
            account_id: model.id,
            owner_id: model.owner_id,
            account_type: model.account_type,
            currency: model.currency,
            balance: money::from_minor_units(model.balance),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryView {
    transaction_id: i64,
    account_id: i64,
    amount: Decimal,
    transaction_type: &'static str,
    description: String,
    related_party: String,
    created_at: String,
}

impl From<journal_entry::Model> for EntryView {
    fn from(model: journal_entry::Model) -> Self {
        Self {
            transaction_id: model.id,
            account_id: model.account_id,
            amount: money::from_minor_units(model.amount),
            transaction_type: model.entry_type.label(),
            description: model.description,
            related_party: model.counterparty,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

pub(super) async fn transfer(db: &DatabaseConnection, params: TransferParams) -> Result<ActionResponse> {
    let result = transfer::transfer(
        db,
        TransferRequest {
            from_account_id: params.from_account_id,
            to_account_id: params.to_account_id,
            amount: params.amount,
            description: params.description,
            idempotency_key: params.idempotency_key,
        },
    )
    .await?;

    let message = format!(
        "Transfer completed successfully! {} transferred from account {} to account {}. \
         Transactions created: #{} (debit) and #{} (credit). Description: {}",
        money::format_decimal(result.amount),
        result.from_account_id,
        result.to_account_id,
        result.debit_entry_id,
        result.credit_entry_id,
        result.description,
    );
    let data = serde_json::json!({
        "debitTransactionId": result.debit_entry_id,
        "creditTransactionId": result.credit_entry_id,
        "amount": result.amount,
        "fromAccountId": result.from_account_id,
        "toAccountId": result.to_account_id,
        "description": result.description,
    });
    Ok(ActionResponse::success(message, Some(data)))
}

pub(super) async fn post_entry(db: &DatabaseConnection, params: PostEntryParams) -> Result<ActionResponse> {
    let entry_type = params.transaction_type;
    // Balance is read inside the posting transaction
    let posted = posting::post_entry(
        db,
        PostingRequest {
            account_id: params.account_id,
            amount: params.amount,
            entry_type,
            description: params
                .description
                .unwrap_or_else(|| entry_type.label().to_string()),
            counterparty: params.related_party.unwrap_or_default(),
        },
    )
    .await?;

    let (entry, balance) = (posted.entry, money::from_minor_units(posted.balance));
    let message = format!(
        "Transaction #{} recorded: {} of {} on account {}. New balance: {}",
        entry.id,
        entry_type.label(),
        money::format_minor_units(entry.amount.abs()),
        entry.account_id,
        money::format_decimal(balance),
    );
    let mut data = serde_json::to_value(EntryView::from(entry))?;
    data["balance"] = serde_json::to_value(balance)?;
    Ok(ActionResponse::success(message, Some(data)))
}

pub(super) async fn get_balance(db: &DatabaseConnection, params: AccountParams) -> Result<ActionResponse> {
    let account = ledger::get_account(db, params.account_id).await?;
    let view = AccountView::from(account);

    let message = format!(
        "Account balance for account {} is {}",
        view.account_id,
        money::format_decimal(view.balance)
    );
    Ok(ActionResponse::success(message, Some(serde_json::to_value(view)?)))
}

pub(super) async fn list_accounts(db: &DatabaseConnection, params: OwnerParams) -> Result<ActionResponse> {
    let accounts: Vec<AccountView> = ledger::list_accounts(db, params.owner_id)
        .await?
        .into_iter()
        .map(AccountView::from)
        .collect();

    if accounts.is_empty() {
        return Ok(ActionResponse::success(
            format!("No accounts found for user {}", params.owner_id),
            Some(serde_json::json!([])),
        ));
    }

    let mut message = format!("Accounts for user {}:\n", params.owner_id);
    for account in &accounts {
        let _ = write!(
            message,
            "\n• Account {} ({}, {}): {}",
            account.account_id,
            account.account_type,
            account.currency,
            money::format_decimal(account.balance)
        );
    }
    Ok(ActionResponse::success(message, Some(serde_json::to_value(accounts)?)))
}

pub(super) async fn recent_transactions(
    db: &DatabaseConnection,
    params: HistoryParams,
) -> Result<ActionResponse> {
    if params.limit == Some(0) {
        return Err(Error::InvalidRequest {
            message: "limit must be at least 1".to_string(),
        });
    }

    // Unknown accounts are reported as such rather than as an empty history
    ledger::get_account(db, params.account_id).await?;

    let entries: Vec<EntryView> = journal::recent_entries(db, params.account_id, params.limit)
        .await?
        .into_iter()
        .map(EntryView::from)
        .collect();

    if entries.is_empty() {
        return Ok(ActionResponse::success(
            format!("No transactions found for account {}", params.account_id),
            Some(serde_json::json!([])),
        ));
    }

    let mut message = format!("Recent transactions for account {}:\n", params.account_id);
    for entry in &entries {
        let _ = write!(
            message,
            "\n• #{} {}: {} - {}",
            entry.transaction_id,
            entry.transaction_type,
            money::format_decimal(entry.amount),
            entry.description
        );
        if !entry.related_party.is_empty() {
            let _ = write!(message, " ({})", entry.related_party);
        }
    }
    Ok(ActionResponse::success(message, Some(serde_json::to_value(entries)?)))
}
