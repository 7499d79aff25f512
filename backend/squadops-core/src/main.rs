// src/main.rs

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod api;
mod attendance;
mod dashboard;
mod dispatch;
mod error;
mod justification;
mod model;
mod report;
mod roster;
mod store;

#[cfg(test)]
mod attendance_tests;
#[cfg(test)]
mod roster_tests;

use api::AppState;
use dispatch::{DispatchConfig, ReportDispatcher, SmtpMailTransport};
use error::AppError;
use roster::RosterService;
use store::{StoreClient, StoreConfig};

#[derive(Parser, Debug)]
#[command(name = "squadops-core", about = "Squadron administration backend")]
struct Cli {
    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,
    /// Port to listen on.
    #[arg(long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let store_config = load_store_config()?;
    let store = StoreClient::new(store_config).context("Initializing row store client failed")?;
    info!("Row store client initialized.");

    let roster = RosterService::new(store.clone());

    let dispatcher = match load_dispatch_config()? {
        Some(config) => {
            let transport = SmtpMailTransport::new(&config)
                .context("Initializing SMTP transport failed")?;
            info!(
                "Mail dispatch configured with {} recipients.",
                config.recipients.len()
            );
            Some(Arc::new(ReportDispatcher::new(config, Arc::new(transport))))
        }
        None => {
            warn!("SMTP configuration incomplete; report dispatch endpoints are disabled.");
            None
        }
    };

    let state = AppState {
        store,
        roster,
        dispatcher,
    };
    info!("Application state initialized.");

    let app = api::router(state);

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port)
        .parse()
        .context("Invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Binding HTTP listener failed")?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await.context("HTTP server failed")?;

    Ok(())
}

fn load_store_config() -> Result<StoreConfig, AppError> {
    Ok(StoreConfig {
        base_url: env::var("STORE_URL")
            .map_err(|_| AppError::MissingEnvVar("STORE_URL".to_string()))?,
        api_key: env::var("STORE_API_KEY")
            .map_err(|_| AppError::MissingEnvVar("STORE_API_KEY".to_string()))?,
    })
}

/// SMTP settings are optional as a block: with no SMTP_SERVER the service
/// runs with dispatch disabled. Once SMTP_SERVER is set, the remaining
/// settings (and the recipient list) are required.
fn load_dispatch_config() -> Result<Option<DispatchConfig>, AppError> {
    let smtp_server = match env::var("SMTP_SERVER") {
        Ok(server) if !server.trim().is_empty() => server,
        _ => return Ok(None),
    };
    let recipients: Vec<String> = env::var("REPORT_RECIPIENTS")
        .map_err(|_| AppError::MissingEnvVar("REPORT_RECIPIENTS".to_string()))?
        .split(',')
        .map(|address| address.trim().to_string())
        .filter(|address| !address.is_empty())
        .collect();
    Ok(Some(DispatchConfig {
        smtp_server,
        smtp_port: env::var("SMTP_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(587),
        smtp_username: env::var("SMTP_USERNAME")
            .map_err(|_| AppError::MissingEnvVar("SMTP_USERNAME".to_string()))?,
        smtp_password: env::var("SMTP_PASSWORD")
            .map_err(|_| AppError::MissingEnvVar("SMTP_PASSWORD".to_string()))?,
        from_address: env::var("SMTP_FROM")
            .map_err(|_| AppError::MissingEnvVar("SMTP_FROM".to_string()))?,
        recipients,
    }))
}
