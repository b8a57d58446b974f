//! Ticket sale orchestrator - Oversell-proof seat purchases.
//!
//! A purchase reserves seats and records the sale in one database transaction.
//! Running out of seats is a normal outcome ([`PurchaseOutcome::SoldOut`]), not
//! an error, and writes nothing. If recording the sale fails after the seats
//! were reserved, the transaction is dropped and the decrement is undone.

use crate::{
    core::{deadline, idempotency, inventory},
    entities::ticket_sale,
    errors::{Error, Result, SOLD_OUT_MESSAGE},
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Operation name recorded with idempotency keys.
pub const OPERATION: &str = "purchase";

/// Parameters of a purchase request.
#[derive(Debug, Clone)]
pub struct PurchaseRequest {
    pub section_number: i32,
    pub seat_count: i32,
    pub purchaser_name: String,
    pub purchaser_phone: String,
    pub purchaser_email: String,
    /// Optional caller-supplied deduplication token
    pub idempotency_key: Option<String>,
}

/// Either a committed sale or a sold-out section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOutcome {
    Purchased(ticket_sale::Model),
    SoldOut {
        section_number: i32,
        message: String,
    },
}

impl PurchaseOutcome {
    fn sold_out(section_number: i32) -> Self {
        Self::SoldOut {
            section_number,
            message: SOLD_OUT_MESSAGE.to_string(),
        }
    }
}

/// Buys `seat_count` seats in a section for one purchaser.
///
/// A missing section and a section with too few seats both yield
/// [`PurchaseOutcome::SoldOut`], as does asking for more seats than the
/// section holds.
///
/// # Errors
/// * [`Error::InvalidRequest`] - non-positive seat count or blank purchaser name
/// * [`Error::Database`] - storage fault; the unit rolled back and may be retried
#[instrument(
    skip(db, request),
    fields(section = request.section_number, seats = request.seat_count)
)]
pub async fn purchase(db: &DatabaseConnection, request: PurchaseRequest) -> Result<PurchaseOutcome> {
    if request.seat_count <= 0 {
        return Err(Error::InvalidRequest {
            message: format!("seat count must be positive, got {}", request.seat_count),
        });
    }
    if request.purchaser_name.trim().is_empty() {
        return Err(Error::InvalidRequest {
            message: "purchaser name is required".to_string(),
        });
    }

    if let Some(key) = request.idempotency_key.as_deref() {
        idempotency::validate_key(key)?;
        if let Some(previous) =
            idempotency::lookup::<ticket_sale::Model, _>(db, key, OPERATION).await?
        {
            info!(key, sale_id = previous.id, "Purchase already applied, returning original sale");
            return Ok(PurchaseOutcome::Purchased(previous));
        }
    }

    match execute(db, &request).await {
        Err(err) if idempotency::is_duplicate_key(&err) => {
            let Some(key) = request.idempotency_key.as_deref() else {
                return Err(err);
            };
            warn!(key, "Concurrent purchase with the same key, returning winner's sale");
            idempotency::resolve_duplicate(db, key, OPERATION, err)
                .await
                .map(PurchaseOutcome::Purchased)
        }
        other => other,
    }
}

async fn execute(db: &DatabaseConnection, request: &PurchaseRequest) -> Result<PurchaseOutcome> {
    let txn = db.begin().await?;

    let reservation =
        match inventory::reserve_seats(&txn, request.section_number, request.seat_count).await {
            Ok(reservation) => reservation,
            Err(Error::InsufficientInventory { .. } | Error::SectionNotFound { .. }) => {
                txn.rollback().await?;
                info!("Section sold out");
                return Ok(PurchaseOutcome::sold_out(request.section_number));
            }
            Err(err) => return Err(err),
        };

    let sale = ticket_sale::ActiveModel {
        section_number: Set(reservation.section_number),
        seat_count: Set(reservation.seat_count),
        seat_number: Set(reservation.seat_label()),
        price_at_sale: Set(reservation.price_per_seat),
        purchaser_name: Set(request.purchaser_name.trim().to_string()),
        purchaser_phone: Set(request.purchaser_phone.trim().to_string()),
        purchaser_email: Set(request.purchaser_email.trim().to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if let Some(key) = request.idempotency_key.as_deref() {
        idempotency::record(&txn, key, OPERATION, &sale).await?;
    }

    deadline::commit(txn).await?;
    info!(
        sale_id = sale.id,
        seat_number = %sale.seat_number,
        remaining = reservation.remaining_seats,
        "Ticket sale committed"
    );
    Ok(PurchaseOutcome::Purchased(sale))
}
