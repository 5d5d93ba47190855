use anyhow::{Context, Result};
use liberclaw::{logging, App, AuthSession};
use liberclaw_api::Client;
use liberclaw_auth::{DeviceIdStore, FileTokenStore, Settings};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let log_path = logging::init_logging()?;
    tracing::info!("liberclaw starting, logging to {}", log_path.display());

    let settings = Settings::new().context("Failed to load configuration")?;
    settings.validate().map_err(anyhow::Error::msg)?;
    tracing::info!("Using server {}", settings.server_url);

    let tokens = Arc::new(FileTokenStore::new()?);
    let client = Client::from_settings(&settings, tokens)?;

    App::new(AuthSession::new(client), DeviceIdStore::new()?)
        .run()
        .await?;

    tracing::info!("liberclaw exiting");
    Ok(())
}
