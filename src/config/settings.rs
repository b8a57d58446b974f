//! Runtime settings for one action invocation.
//!
//! Everything is read from the environment (after `.env` has been loaded by
//! the binary), so each deployment resolves its own store coordinates.

use crate::config::database;
use crate::errors::{Error, Result};
use std::{path::PathBuf, time::Duration};
use tracing::{debug, instrument};

/// Default deadline for a single invocation.
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 10_000;

/// Settings resolved for one run of the binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Store connection coordinates
    pub database_url: String,
    /// Deadline after which an invocation is abandoned and rolled back
    pub action_timeout: Duration,
    /// Optional TOML file used to seed accounts and sections
    pub provisioning_file: Option<PathBuf>,
}

/// Loads the application configuration from environment variables.
///
/// * `DATABASE_URL` - store URL, see [`database::DEFAULT_DATABASE_URL`]
/// * `ACTION_TIMEOUT_MS` - per-invocation deadline in milliseconds
/// * `PROVISIONING_FILE` - path to a provisioning TOML file
#[instrument]
pub fn load_app_configuration() -> Result<AppConfig> {
    let action_timeout = match std::env::var("ACTION_TIMEOUT_MS") {
        Ok(raw) => parse_timeout(&raw)?,
        Err(_) => Duration::from_millis(DEFAULT_ACTION_TIMEOUT_MS),
    };

    let config = AppConfig {
        database_url: database::get_database_url(),
        action_timeout,
        provisioning_file: std::env::var("PROVISIONING_FILE").ok().map(PathBuf::from),
    };
    debug!(
        timeout = ?config.action_timeout,
        provisioning = ?config.provisioning_file,
        "Configuration loaded"
    );
    Ok(config)
}

fn parse_timeout(raw: &str) -> Result<Duration> {
    let millis: u64 = raw.trim().parse().map_err(|e| Error::Config {
        message: format!("ACTION_TIMEOUT_MS must be a whole number of milliseconds: {e}"),
    })?;
    if millis == 0 {
        return Err(Error::Config {
            message: "ACTION_TIMEOUT_MS must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_millis(millis))
}
