//! Seat inventory store - Per-section seat counters and prices.
//!
//! Seats are only ever taken through [`reserve_seats`], whose availability
//! check and decrement are one conditional `UPDATE`. Two buyers racing for the
//! last seats can therefore never both succeed.

use crate::{
    core::money,
    entities::{SeatSection, seat_section},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::{debug, instrument};

/// Seats left in a section and the price of one seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub section_number: i32,
    pub available_seats: i32,
    pub price: Decimal,
}

/// Outcome of a successful reservation, read inside the reserving transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub section_number: i32,
    pub seat_count: i32,
    /// Per-seat price in minor units at the moment of reservation
    pub price_per_seat: i64,
    /// Seats left after this reservation
    pub remaining_seats: i32,
    pub capacity: i32,
}

impl Reservation {
    /// Opaque label for the reserved seats, e.g. `"S5-1"` or `"S5-1..3"`.
    ///
    /// Seats are numbered from 1 in the order they are sold.
    #[must_use]
    pub fn seat_label(&self) -> String {
        let sold_before = self.capacity - self.remaining_seats - self.seat_count;
        let first = sold_before.max(0) + 1;
        let last = first + self.seat_count - 1;
        if first == last {
            format!("S{}-{first}", self.section_number)
        } else {
            format!("S{}-{first}..{last}", self.section_number)
        }
    }
}

/// Finds a section, failing with [`Error::SectionNotFound`] if it is missing.
pub async fn get_section<C>(db: &C, section_number: i32) -> Result<seat_section::Model>
where
    C: ConnectionTrait,
{
    SeatSection::find_by_id(section_number)
        .one(db)
        .await?
        .ok_or(Error::SectionNotFound { section_number })
}

/// Returns the seats left in a section and its per-seat price.
#[instrument(skip(db))]
pub async fn get_availability<C>(db: &C, section_number: i32) -> Result<Availability>
where
    C: ConnectionTrait,
{
    let section = get_section(db, section_number).await?;
    Ok(Availability {
        section_number: section.section_number,
        available_seats: section.available_seats,
        price: money::from_minor_units(section.price_per_seat),
    })
}

/// Lists sections that still have seats, by section number.
pub async fn list_available_sections<C>(db: &C) -> Result<Vec<seat_section::Model>>
where
    C: ConnectionTrait,
{
    SeatSection::find()
        .filter(seat_section::Column::AvailableSeats.gt(0))
        .order_by_asc(seat_section::Column::SectionNumber)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Provisions a section with all of its seats available.
pub async fn create_section<C>(
    db: &C,
    section_number: i32,
    capacity: i32,
    price: Decimal,
    distance_label: String,
) -> Result<seat_section::Model>
where
    C: ConnectionTrait,
{
    if capacity < 0 {
        return Err(Error::InvalidRequest {
            message: format!("section {section_number} cannot have a negative capacity"),
        });
    }
    let price_per_seat = money::to_minor_units(price)?;
    if price_per_seat < 0 {
        return Err(Error::InvalidAmount { amount: price });
    }

    let section = seat_section::ActiveModel {
        section_number: Set(section_number),
        capacity: Set(capacity),
        available_seats: Set(capacity),
        price_per_seat: Set(price_per_seat),
        distance_label: Set(distance_label),
    };
    section.insert(db).await.map_err(Into::into)
}

/// Takes `count` seats from a section if, and only if, that many are left.
///
/// Runs `UPDATE seat_sections SET available_seats = available_seats - count
/// WHERE section_number = ? AND available_seats >= count`; the decrement and
/// the check cannot be separated by another writer. When run inside a
/// transaction the section row stays write-locked until commit, so the price
/// read back here is the one the seats were reserved at.
///
/// # Errors
/// * [`Error::InvalidRequest`] - `count` is not positive
/// * [`Error::SectionNotFound`] - no such section
/// * [`Error::InsufficientInventory`] - fewer than `count` seats left
#[instrument(skip(db))]
pub async fn reserve_seats<C>(db: &C, section_number: i32, count: i32) -> Result<Reservation>
where
    C: ConnectionTrait,
{
    if count <= 0 {
        return Err(Error::InvalidRequest {
            message: format!("seat count must be positive, got {count}"),
        });
    }

    let result = SeatSection::update_many()
        .col_expr(
            seat_section::Column::AvailableSeats,
            Expr::col(seat_section::Column::AvailableSeats).sub(count),
        )
        .filter(seat_section::Column::SectionNumber.eq(section_number))
        .filter(seat_section::Column::AvailableSeats.gte(count))
        .exec(db)
        .await?;

    let section = get_section(db, section_number).await?;
    if result.rows_affected == 0 {
        debug!(available = section.available_seats, "Not enough seats");
        return Err(Error::InsufficientInventory {
            section_number,
            requested: count,
        });
    }

    Ok(Reservation {
        section_number,
        seat_count: count,
        price_per_seat: section.price_per_seat,
        remaining_seats: section.available_seats,
        capacity: section.capacity,
    })
}
