//! Seat section entity - Per-section seat counter and price.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Seat section database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seat_sections")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub section_number: i32,
    /// Total seats the section was provisioned with
    pub capacity: i32,
    /// Seats still for sale; never negative
    pub available_seats: i32,
    /// Price of one seat in minor units
    pub price_per_seat: i64,
    /// How far the section is from the ground, as shown to buyers
    pub distance_label: String,
}

/// Defines relationships between SeatSection and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One section has many sales
    #[sea_orm(has_many = "super::ticket_sale::Entity")]
    TicketSales,
}

impl Related<super::ticket_sale::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TicketSales.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
