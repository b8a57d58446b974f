/// Database configuration and connection management
pub mod database;

/// Account and seat section provisioning from a TOML file
pub mod provisioning;

/// Runtime settings resolved from environment variables
pub mod settings;

pub use settings::{AppConfig, load_app_configuration};
