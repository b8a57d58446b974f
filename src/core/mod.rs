//! Core business logic - framework-agnostic ledger and ticketing operations.
//!
//! Stores (`ledger`, `journal`, `inventory`) expose primitives generic over
//! `ConnectionTrait` so they compose inside one database transaction; the
//! orchestrators (`transfer`, `posting`, `ticketing`) own those transactions.

pub mod deadline;
pub mod idempotency;
pub mod inventory;
pub mod journal;
pub mod ledger;
pub mod money;
pub mod posting;
pub mod ticketing;
pub mod transfer;
