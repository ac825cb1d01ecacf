//! Opflow CLI and Server Binary
//!
//! `serve` runs the HTTP API, `capture` runs one capture and prints it,
//! `validate` and `init` manage the configuration file.

mod app;

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use common::Ticker;
use config::{
    config_from_env, generate_default_config, load_config, save_config, validate_config, OpflowConfig,
};
use observability::{init_logging, init_metrics, LogFormat};
use orchestrator::analytics_routes;
use server::{health_routes, validate_port_available, HealthState, HttpServer, ServerConfig, ServerExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::app::{App, StoreProbe};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // `init` must work without a readable config
    let config = match &cli.command {
        Commands::Init { .. } => generate_default_config(),
        _ => read_config(cli.config.as_deref())?,
    };

    let format = match cli.log_format {
        Some(arg) => LogFormat::parse(arg.as_str()).unwrap_or_default(),
        None => LogFormat::parse(&config.observability.log_format).unwrap_or_default(),
    };
    init_logging("opflow", format)?;
    debug!(?cli, "CLI arguments parsed");

    match cli.command {
        Commands::Serve { http } => {
            info!("Executing 'serve' command");
            serve(config, http).await
        }
        Commands::Capture { ticker, screen } => {
            info!("Executing 'capture' command");
            capture_command(config, &ticker, screen).await
        }
        Commands::Validate => {
            info!("Executing 'validate' command");
            validate_command(&config, cli.config.as_deref())
        }
        Commands::Init { output } => {
            info!("Executing 'init' command");
            init_command(output)
        }
    }
}

fn read_config(path: Option<&Path>) -> Result<OpflowConfig> {
    match path {
        Some(path) => load_config(path),
        None => config_from_env(),
    }
}

/// Refuse to start on a config with errors; log warnings
fn ensure_valid(config: &OpflowConfig) -> Result<()> {
    let report = validate_config(config);

    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }

    if !report.is_valid() {
        error!(error_count = report.errors.len(), "Configuration validation failed");
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot start due to configuration errors");
    }
    Ok(())
}

async fn serve(config: OpflowConfig, http_override: Option<u16>) -> Result<()> {
    ensure_valid(&config)?;

    if let Some(port) = config.observability.metrics_port {
        init_metrics(port)?;
    }

    let http_port = http_override.unwrap_or(config.server.http_port);
    let server_config = ServerConfig::new(config.server.host.clone(), http_port)
        .with_request_timeout(Duration::from_secs(config.server.request_timeout_secs));
    validate_port_available(&server_config).await?;

    let app = App::build(&config).await?;
    let health = HealthState::new("opflow").with_probe(Arc::new(StoreProbe::new(app.store.clone())));
    let router = analytics_routes(app.orchestrator.clone()).merge(health_routes(Arc::new(health)));

    info!(host = %config.server.host, http_port, "Starting Opflow");
    HttpServer::new(server_config, router).run_until_signal().await?;

    info!("Opflow stopped");
    Ok(())
}

async fn capture_command(config: OpflowConfig, ticker: &str, screen: bool) -> Result<()> {
    ensure_valid(&config)?;
    let ticker = Ticker::parse(ticker)?;

    let app = App::build(&config).await?;
    let screener = screen.then(|| app.orchestrator.settings().screener.clone());
    let result = app.orchestrator.capture(&ticker, screener.as_ref()).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn validate_command(config: &OpflowConfig, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => info!(?path, "Validating configuration"),
        None => info!("Validating defaults and environment"),
    }

    let report = validate_config(config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("HTTP: {}:{}", config.server.host, config.server.http_port);
    println!("Quote provider: {}", config.providers.quote.base_url);
    println!("Chain provider: {}", config.providers.chain.base_url);
    println!(
        "Storage: {}",
        if config.storage.database_url.is_some() { "postgres" } else { "in-memory" }
    );
    println!("Ticker lists: {}", config.ticker_lists.len());

    Ok(())
}

fn init_command(output_path: PathBuf) -> Result<()> {
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, &output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("Next steps:");
    println!("  1. Set OPFLOW_QUOTE_TOKEN and OPFLOW_CHAIN_TOKEN for the market data providers");
    println!("  2. Set DATABASE_URL to persist snapshots in PostgreSQL");
    println!("  3. Run 'opflow validate --config {:?}' to check configuration", output_path);
    println!("  4. Run 'opflow serve --config {:?}' to start the API", output_path);

    Ok(())
}
