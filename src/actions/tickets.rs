use crate::{
    actions::ActionResponse,
    core::{
        inventory, money,
        ticketing::{self, PurchaseOutcome, PurchaseRequest},
    },
    entities::ticket_sale,
    errors::{ErrorKind, Result},
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Parameters of `purchase`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseParams {
    pub section_number: i32,
    pub seat_count: i32,
    pub purchaser_name: String,
    #[serde(default)]
    pub purchaser_phone: String,
    #[serde(default)]
    pub purchaser_email: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Committed sale as reported to the purchaser.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaleReceipt {
    transaction_number: i64,
    section_number: i32,
    seat_count: i32,
    seat_number: String,
    price_per_seat: Decimal,
    total_price: Decimal,
    purchaser_name: String,
    purchaser_phone: String,
    purchaser_email: String,
}

impl From<ticket_sale::Model> for SaleReceipt {
    fn from(sale: ticket_sale::Model) -> Self {
        let price_per_seat = money::from_minor_units(sale.price_at_sale);
        Self {
            transaction_number: sale.id,
            section_number: sale.section_number,
            seat_count: sale.seat_count,
            seat_number: sale.seat_number,
            price_per_seat,
            total_price: price_per_seat * Decimal::from(sale.seat_count),
            purchaser_name: sale.purchaser_name,
            purchaser_phone: sale.purchaser_phone,
            purchaser_email: sale.purchaser_email,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SectionView {
    section_number: i32,
    available_seats: i32,
    capacity: i32,
    price: Decimal,
    distance_label: String,
}

pub(super) async fn purchase(db: &DatabaseConnection, params: PurchaseParams) -> Result<ActionResponse> {
    let outcome = ticketing::purchase(
        db,
        PurchaseRequest {
            section_number: params.section_number,
            seat_count: params.seat_count,
            purchaser_name: params.purchaser_name,
            purchaser_phone: params.purchaser_phone,
            purchaser_email: params.purchaser_email,
            idempotency_key: params.idempotency_key,
        },
    )
    .await?;

    match outcome {
        PurchaseOutcome::Purchased(sale) => {
            let receipt = SaleReceipt::from(sale);
            let message = format!(
                "Ticket purchase successful!\n\n\
                 Transaction number: {}\n\
                 Section: {}\n\
                 Seats: {} ({})\n\
                 Price per seat: {}\n\
                 Total: {}\n\
                 Purchaser: {}",
                receipt.transaction_number,
                receipt.section_number,
                receipt.seat_count,
                receipt.seat_number,
                money::format_decimal(receipt.price_per_seat),
                money::format_decimal(receipt.total_price),
                receipt.purchaser_name,
            );
            Ok(ActionResponse::success(message, Some(serde_json::to_value(receipt)?)))
        }
        PurchaseOutcome::SoldOut {
            section_number,
            message,
        } => Ok(ActionResponse::rejected(
            ErrorKind::SoldOut,
            message,
            Some(serde_json::json!({ "sectionNumber": section_number })),
        )),
    }
}

pub(super) async fn available_seats(db: &DatabaseConnection) -> Result<ActionResponse> {
    let sections: Vec<SectionView> = inventory::list_available_sections(db)
        .await?
        .into_iter()
        .map(|section| SectionView {
            section_number: section.section_number,
            available_seats: section.available_seats,
            capacity: section.capacity,
            price: money::from_minor_units(section.price_per_seat),
            distance_label: section.distance_label,
        })
        .collect();

    if sections.is_empty() {
        return Ok(ActionResponse::success(
            "No sections with available seats found".to_string(),
            Some(serde_json::json!([])),
        ));
    }

    let mut message = format!(
        "Available sections with seats (total: {} sections):\n",
        sections.len()
    );
    for section in &sections {
        let _ = write!(
            message,
            "\n• Section {}: {} seats available, {}, {}",
            section.section_number,
            section.available_seats,
            section.distance_label,
            money::format_decimal(section.price)
        );
    }
    Ok(ActionResponse::success(message, Some(serde_json::to_value(sections)?)))
}
