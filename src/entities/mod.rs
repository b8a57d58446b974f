//! Entity module - Contains all SeaORM entity definitions for the database.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod account;
pub mod idempotency_record;
pub mod journal_entry;
pub mod seat_section;
pub mod ticket_sale;

// Re-export specific types to avoid conflicts
pub use account::{Column as AccountColumn, Entity as Account, Model as AccountModel};
pub use idempotency_record::{
    Column as IdempotencyRecordColumn, Entity as IdempotencyRecord,
    Model as IdempotencyRecordModel,
};
pub use journal_entry::{
    Column as JournalEntryColumn, Entity as JournalEntry, EntryType, Model as JournalEntryModel,
};
pub use seat_section::{
    Column as SeatSectionColumn, Entity as SeatSection, Model as SeatSectionModel,
};
pub use ticket_sale::{Column as TicketSaleColumn, Entity as TicketSale, Model as TicketSaleModel};
