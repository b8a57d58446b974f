//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        inventory, ledger,
        posting::{self, PostingRequest},
    },
    entities::{self, EntryType},
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, DatabaseConnection};
use tempfile::TempDir;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database in a fresh temporary directory,
/// with a pool of up to `max_connections` connections.
///
/// Unlike `sqlite::memory:`, whose pool holds a single connection, this lets
/// tasks hit the store concurrently. Keep the returned [`TempDir`] alive for
/// as long as the connection is used.
pub async fn setup_file_test_db(max_connections: u32) -> Result<(DatabaseConnection, TempDir)> {
    let dir = tempfile::tempdir()?;
    let db = connect_file_test_db(&dir, max_connections).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((db, dir))
}

/// Opens another pool on the database created by [`setup_file_test_db`].
pub async fn connect_file_test_db(dir: &TempDir, max_connections: u32) -> Result<DatabaseConnection> {
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.sqlite").display());

    let mut options = ConnectOptions::new(url);
    options
        .max_connections(max_connections)
        .min_connections(1)
        .sqlx_logging(false);

    Ok(sea_orm::Database::connect(options).await?)
}

/// Creates a test account holding `opening_balance`.
///
/// A positive opening balance is posted as a `Credit` journal entry so the
/// account reconciles with its journal.
///
/// # Defaults
/// * `owner_id`: None
/// * `account_type`: "Checking"
/// * `currency`: "USD"
pub async fn create_test_account(
    db: &DatabaseConnection,
    opening_balance: Decimal,
) -> Result<entities::account::Model> {
    let account = ledger::open_account(
        db,
        ledger::NewAccount {
            id: None,
            owner_id: None,
            account_type: "Checking".to_string(),
            currency: "USD".to_string(),
        },
    )
    .await?;

    if opening_balance > Decimal::ZERO {
        posting::post_entry(
            db,
            PostingRequest {
                account_id: account.id,
                amount: opening_balance,
                entry_type: EntryType::Credit,
                description: "Opening balance".to_string(),
                counterparty: "Bank".to_string(),
            },
        )
        .await?;
    }

    ledger::get_account(db, account.id).await
}

/// Creates an empty account linked to `owner_id`.
pub async fn create_owned_account(
    db: &DatabaseConnection,
    owner_id: i64,
    account_type: &str,
) -> Result<entities::account::Model> {
    ledger::open_account(
        db,
        ledger::NewAccount {
            id: None,
            owner_id: Some(owner_id),
            account_type: account_type.to_string(),
            currency: "USD".to_string(),
        },
    )
    .await
}

/// Creates a section with all `capacity` seats available.
///
/// # Defaults
/// * `distance_label`: "Lower level"
pub async fn create_test_section(
    db: &DatabaseConnection,
    section_number: i32,
    capacity: i32,
    price: Decimal,
) -> Result<entities::seat_section::Model> {
    inventory::create_section(
        db,
        section_number,
        capacity,
        price,
        "Lower level".to_string(),
    )
    .await
}
