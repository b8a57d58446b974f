use bank_actions::{
    actions,
    config::{self, database, provisioning},
    errors::Result,
};
use dotenvy::dotenv;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing; stdout is reserved for the action response
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Connect and make sure the tables exist
    let db = database::create_connection(&app_config.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed accounts and sections, if a provisioning file is configured
    if let Some(path) = &app_config.provisioning_file {
        let plan = provisioning::load_provisioning(path)?;
        provisioning::seed(&db, &plan)
            .await
            .inspect_err(|e| error!("Failed to apply provisioning: {}", e))?;
    }

    // 6. Run one action read from stdin
    let mut raw = String::new();
    tokio::io::stdin().read_to_string(&mut raw).await?;

    let response = actions::handle_json(&db, &raw, app_config.action_timeout).await;

    let mut out = serde_json::to_vec_pretty(&response)?;
    out.push(b'\n');
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&out).await?;
    stdout.flush().await?;

    Ok(())
}
