use acmeproxy::{Config, Shared};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let mut first_args = std::env::args().take(2);
    let (program_name, config_file) = (
        first_args.next().unwrap_or("acmeproxy".to_string()),
        first_args.next(),
    );

    let config = config_init(&program_name, config_file)?;
    if config.allowed_domains.is_empty() {
        tracing::warn!("allowed-domains is empty; every challenge request will be rejected");
    }

    let provider = config.dns_provider().await?;
    let credentials = config.credential_store()?;
    let access_log = config.access_log_sink().await?;

    tracing::info!(provider = provider.name(), "API listening on {}", &config.bind_addr);
    let api_server = acmeproxy::new_http(config.clone(), provider, credentials, access_log);
    let api_handle = tokio::spawn(api_server);

    // TODO(XXX): proper graceful shutdown.
    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
        },
        Ok(api_res) = api_handle => {
            if let Err(err) = api_res {
                return Err(err.into())
            }
        }
    }
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "acmeproxy=info".into()),
        )
        .init();
}

fn config_init(program_name: &str, config_file: Option<String>) -> Result<Shared> {
    match config_file {
        None => Err(anyhow!("usage: {program_name} /path/to/config.json")),
        Some(config_file) => {
            let config = Config::try_from_file(&config_file)?;
            tracing::debug!("loaded config from {config_file}");
            Ok(Arc::new(config))
        }
    }
}
