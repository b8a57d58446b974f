//! Account and seat section provisioning from a TOML file.
//!
//! Accounts and sections are normally provisioned by an external system. For
//! local runs a provisioning file can seed them; rows that already exist are
//! left untouched, so seeding is safe to repeat.

use crate::{
    core::{
        inventory, ledger,
        posting::{self, PostingRequest},
    },
    entities::{Account, EntryType, SeatSection},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Configuration structure representing the entire provisioning file
#[derive(Debug, Deserialize, Default)]
pub struct Provisioning {
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
    #[serde(default)]
    pub sections: Vec<SectionConfig>,
}

/// Configuration for a single account
#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    pub id: i64,
    #[serde(default)]
    pub owner_id: Option<i64>,
    pub account_type: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Posted as a `Credit` entry when the account is created
    #[serde(default)]
    pub opening_balance: Decimal,
}

/// Configuration for a single seat section
#[derive(Debug, Deserialize, Clone)]
pub struct SectionConfig {
    pub section_number: i32,
    pub capacity: i32,
    pub price: Decimal,
    #[serde(default)]
    pub distance_label: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Summary of what a seeding run created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub accounts_created: usize,
    pub sections_created: usize,
}

/// Loads provisioning from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_provisioning<P: AsRef<Path>>(path: P) -> Result<Provisioning> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read provisioning file {:?}: {e}", path.as_ref()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse provisioning file: {e}"),
    })
}

/// Creates every configured account and section that does not exist yet.
///
/// Each account is opened together with its opening balance in one
/// transaction, so a failed seed never leaves an account without its credit.
///
/// # Errors
/// Returns [`Error::InvalidAmount`] for a negative opening balance, before
/// anything for that account is written.
#[instrument(skip_all)]
pub async fn seed(db: &DatabaseConnection, provisioning: &Provisioning) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for config in &provisioning.accounts {
        if Account::find_by_id(config.id).one(db).await?.is_some() {
            debug!(account_id = config.id, "Account already provisioned");
            continue;
        }

        if config.opening_balance < Decimal::ZERO {
            return Err(Error::InvalidAmount {
                amount: config.opening_balance,
            });
        }

        let txn = db.begin().await?;
        let account = ledger::open_account(
            &txn,
            ledger::NewAccount {
                id: Some(config.id),
                owner_id: config.owner_id,
                account_type: config.account_type.clone(),
                currency: config.currency.clone(),
            },
        )
        .await?;

        if config.opening_balance > Decimal::ZERO {
            posting::apply_entry(
                &txn,
                PostingRequest {
                    account_id: account.id,
                    amount: config.opening_balance,
                    entry_type: EntryType::Credit,
                    description: "Opening balance".to_string(),
                    counterparty: "Account provisioning".to_string(),
                },
            )
            .await?;
        }
        txn.commit().await?;
        report.accounts_created += 1;
    }

    for config in &provisioning.sections {
        if SeatSection::find_by_id(config.section_number).one(db).await?.is_some() {
            debug!(section = config.section_number, "Section already provisioned");
            continue;
        }

        inventory::create_section(
            db,
            config.section_number,
            config.capacity,
            config.price,
            config.distance_label.clone(),
        )
        .await?;
        report.sections_created += 1;
    }

    info!(
        accounts = report.accounts_created,
        sections = report.sections_created,
        "Provisioning applied"
    );
    Ok(report)
}
