//! Idempotency record entity - Remembers the result of a keyed invocation.
//!
//! Written inside the same database transaction as the operation it guards, so
//! a record exists exactly when the operation committed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Idempotency record database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "idempotency_records")]
pub struct Model {
    /// Caller-supplied deduplication token
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    /// Operation the key was first used with (`"transfer"`, `"purchase"`)
    pub operation: String,
    /// JSON-serialized result of the original invocation
    pub response: String,
    pub created_at: DateTimeUtc,
}

/// `IdempotencyRecord` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
