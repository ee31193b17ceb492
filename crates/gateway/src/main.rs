use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dn_classifier::ClassifierClient;
use dn_domain::config::{Config, ConfigSeverity};
use dn_gateway::api;
use dn_gateway::identity::IdentityService;
use dn_gateway::pipeline::IngestPipeline;
use dn_gateway::state::AppState;
use dn_store::Store;

/// Process exit codes: 0 normal, 1 bad configuration, 2 storage
/// unreachable at startup.
const EXIT_BAD_CONFIG: i32 = 1;
const EXIT_STORAGE_UNREACHABLE: i32 = 2;

#[derive(Parser)]
#[command(name = "decoynet", about = "DecoyNet deception-telemetry backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (the default).
    Serve,
    /// Load the environment configuration and report issues.
    CheckConfig,
    /// Print the version.
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            init_tracing();
            run_server().await;
        }
        Some(Command::CheckConfig) => {
            let config = match Config::from_env() {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("config: {e}");
                    std::process::exit(EXIT_BAD_CONFIG);
                }
            };
            let issues = config.validate();
            for issue in &issues {
                eprintln!("{issue}");
            }
            if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
                std::process::exit(EXIT_BAD_CONFIG);
            }
            println!("config ok");
        }
        Some(Command::Version) => {
            println!("decoynet {}", env!("CARGO_PKG_VERSION"));
        }
    }
}

/// Initialize structured JSON tracing (only for the `serve` command).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,dn_gateway=debug")),
        )
        .json()
        .init();
}

/// Startup is staged so each failure maps onto its documented exit code:
/// config problems exit 1, an unreachable store exits 2, and everything
/// downstream of a healthy store is a config-class failure again.
async fn run_server() {
    tracing::info!("DecoyNet starting");

    // ── Config ───────────────────────────────────────────────────────
    let config = match load_config() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "configuration invalid");
            std::process::exit(EXIT_BAD_CONFIG);
        }
    };

    // ── Data plane (store + identity, both touch persistence) ────────
    let (store, identity) = match open_data_plane(&config).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "storage unreachable");
            std::process::exit(EXIT_STORAGE_UNREACHABLE);
        }
    };

    // ── Serve ────────────────────────────────────────────────────────
    if let Err(e) = serve(config, store, identity).await {
        tracing::error!(error = %format!("{e:#}"), "server failed");
        std::process::exit(EXIT_BAD_CONFIG);
    }
}

fn load_config() -> anyhow::Result<Config> {
    let config = Config::from_env().context("reading environment configuration")?;

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    Ok(config)
}

async fn open_data_plane(
    config: &Config,
) -> anyhow::Result<(Arc<dyn Store>, Arc<IdentityService>)> {
    let store = dn_store::create_store(&config.storage_uri)
        .with_context(|| format!("opening store at {}", config.storage_uri))?;
    tracing::info!(uri = %config.storage_uri, "store ready");

    let identity = Arc::new(
        IdentityService::new(store.clone(), config)
            .await
            .context("initializing identity service")?,
    );
    tracing::info!(mode = ?config.auth_mode, "identity service ready");

    Ok((store, identity))
}

async fn serve(
    config: Arc<Config>,
    store: Arc<dyn Store>,
    identity: Arc<IdentityService>,
) -> anyhow::Result<()> {
    // ── Classifier client ────────────────────────────────────────────
    let classifier = Arc::new(
        ClassifierClient::new(&config.classifier_url)
            .context("initializing classifier client")?,
    );
    tracing::info!(url = %config.classifier_url, "classifier client ready");

    // ── Ingestion pipeline ───────────────────────────────────────────
    let pipeline = Arc::new(IngestPipeline::new(
        store.clone(),
        classifier.clone(),
        config.alert_risk_threshold,
    ));
    tracing::info!(
        threshold = config.alert_risk_threshold,
        "ingestion pipeline ready"
    );

    // ── HTTP surface ─────────────────────────────────────────────────
    let state = AppState {
        config: config.clone(),
        store,
        classifier,
        identity,
        pipeline,
    };
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "listening");

    axum::serve(listener, app).await.context("serving HTTP")?;
    Ok(())
}
