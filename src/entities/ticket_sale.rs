//! Ticket sale entity - Immutable record of a completed purchase.
//!
//! A row exists only if the matching seat decrement committed with it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ticket sale database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ticket_sales")]
pub struct Model {
    /// Transaction number shown to the purchaser
    #[sea_orm(primary_key)]
    pub id: i64,
    pub section_number: i32,
    /// Number of seats this sale consumed
    pub seat_count: i32,
    /// Opaque seat label, e.g. `"S5-1..3"`
    pub seat_number: String,
    /// Per-seat price captured at reservation time, in minor units
    pub price_at_sale: i64,
    pub purchaser_name: String,
    pub purchaser_phone: String,
    pub purchaser_email: String,
    pub created_at: DateTimeUtc,
}

/// Defines relationships between TicketSale and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each sale belongs to one section
    #[sea_orm(
        belongs_to = "super::seat_section::Entity",
        from = "Column::SectionNumber",
        to = "super::seat_section::Column::SectionNumber"
    )]
    SeatSection,
}

impl Related<super::seat_section::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SeatSection.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
