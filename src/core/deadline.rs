//! Deadlines for atomic units.
//!
//! [`with_deadline`] abandons a unit of work that runs past its deadline, which
//! drops its open transaction and rolls it back. Once the unit has started to
//! commit through [`commit`] it is no longer abandoned: the commit may already
//! have been applied by the store, so the caller waits for the real outcome
//! instead of reporting a timeout for work that took effect.

use crate::errors::{Error, Result};
use sea_orm::DatabaseTransaction;
use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tracing::{debug, warn};

tokio::task_local! {
    static COMMIT_STARTED: Arc<AtomicBool>;
}

/// Commits `txn`, first marking the surrounding unit as committing.
///
/// Outside [`with_deadline`] this is a plain commit.
pub async fn commit(txn: DatabaseTransaction) -> Result<()> {
    // No flag to raise when not running under a deadline
    let _ = COMMIT_STARTED.try_with(|started| started.store(true, Ordering::SeqCst));
    txn.commit().await.map_err(Into::into)
}

/// Runs `work` under `deadline`.
///
/// # Errors
/// Returns [`Error::Timeout`] if the deadline passes before `work` reached its
/// commit; otherwise whatever `work` returns.
pub async fn with_deadline<F, T>(deadline: Duration, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let started = Arc::new(AtomicBool::new(false));
    let work = COMMIT_STARTED.scope(Arc::clone(&started), work);
    tokio::pin!(work);

    tokio::select! {
        result = &mut work => result,
        () = tokio::time::sleep(deadline) => {
            if started.load(Ordering::SeqCst) {
                debug!("Deadline passed while committing, waiting for the outcome");
                work.await
            } else {
                let millis = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
                warn!(millis, "Deadline passed, abandoning the unit");
                Err(Error::Timeout { millis })
            }
        }
    }
}
