//! Idempotency registry for keyed invocations.
//!
//! A caller may attach a deduplication key to a mutating request. The result
//! is stored under that key in the same database transaction as the mutation,
//! and a later request with the same key gets the stored result back instead
//! of applying the mutation again.

use crate::{
    entities::{IdempotencyRecord, idempotency_record},
    errors::{Error, Result},
};
use sea_orm::{Set, SqlErr, prelude::*};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

/// Longest accepted key.
pub const MAX_KEY_LEN: usize = 128;

/// Rejects keys that are blank or too long.
pub fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidRequest {
            message: "idempotency key cannot be blank".to_string(),
        });
    }
    if key.len() > MAX_KEY_LEN {
        return Err(Error::InvalidRequest {
            message: format!("idempotency key is longer than {MAX_KEY_LEN} characters"),
        });
    }
    Ok(())
}

/// Returns the stored result for `key`, if the operation already committed.
///
/// Fails with [`Error::InvalidRequest`] when the key was first used for a
/// different operation.
#[instrument(skip(db))]
pub async fn lookup<T, C>(db: &C, key: &str, operation: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    C: ConnectionTrait,
{
    let Some(record) = IdempotencyRecord::find_by_id(key.to_owned()).one(db).await? else {
        return Ok(None);
    };

    if record.operation != operation {
        return Err(Error::InvalidRequest {
            message: format!(
                "idempotency key '{key}' was already used for a {} request",
                record.operation
            ),
        });
    }

    debug!("Replaying stored result");
    Ok(Some(serde_json::from_str(&record.response)?))
}

/// Stores the result of `operation` under `key`.
///
/// Must run on the same transaction as the mutation it describes. A second
/// insert of the same key fails with a unique-constraint error, see
/// [`is_duplicate_key`].
pub async fn record<T, C>(db: &C, key: &str, operation: &str, response: &T) -> Result<()>
where
    T: Serialize,
    C: ConnectionTrait,
{
    let model = idempotency_record::ActiveModel {
        key: Set(key.to_owned()),
        operation: Set(operation.to_owned()),
        response: Set(serde_json::to_string(response)?),
        created_at: Set(chrono::Utc::now()),
    };
    model.insert(db).await?;
    Ok(())
}

/// Whether `err` is the unique violation raised when two invocations race on
/// the same key.
#[must_use]
pub fn is_duplicate_key(err: &Error) -> bool {
    match err {
        Error::Database(db_err) => matches!(
            db_err.sql_err(),
            Some(SqlErr::UniqueConstraintViolation(_))
        ),
        _ => false,
    }
}

/// Resolves the loser of a duplicate-key race to the winner's stored result.
///
/// Called after the losing transaction has been dropped. If no record can be
/// found the original error is returned unchanged.
pub async fn resolve_duplicate<T, C>(db: &C, key: &str, operation: &str, err: Error) -> Result<T>
where
    T: DeserializeOwned,
    C: ConnectionTrait,
{
    match lookup(db, key, operation).await? {
        Some(previous) => Ok(previous),
        None => Err(err),
    }
}
