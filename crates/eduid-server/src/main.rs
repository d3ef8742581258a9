//! eduid server: wires the identity orchestrator to its adapters and
//! runs until interrupted.

mod config;

use anyhow::Context;
use eduid_auth::IdentityOrchestrator;
use eduid_idp::{HttpInstitutionValidator, InMemoryIdentityGateway, LogNotificationGateway};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("eduid=info")),
        )
        .json()
        .init();

    let settings = Settings::load().context("loading configuration")?;
    tracing::info!(
        institution_service = %settings.institution.base_url,
        "Starting eduid server..."
    );

    let identities = match settings.credentials.pepper.clone() {
        Some(pepper) => InMemoryIdentityGateway::with_pepper(pepper),
        None => InMemoryIdentityGateway::new(),
    };
    let institutions = HttpInstitutionValidator::new(
        &settings.institution.base_url,
        settings.institution_timeout(),
    )
    .context("configuring the institution service client")?;

    let orchestrator = IdentityOrchestrator::new(
        identities,
        institutions,
        LogNotificationGateway,
        settings.identity.clone(),
    );
    tracing::info!("Identity orchestrator ready");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for the shutdown signal")?;

    tracing::info!("Shutting down, draining pending notifications");
    orchestrator.shutdown().await;
    tracing::info!("eduid server stopped.");
    Ok(())
}
