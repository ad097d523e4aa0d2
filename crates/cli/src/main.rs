//! wabridge — WhatsApp → webhook bridge.
//!
//! Connects one WhatsApp account (via the Baileys sidecar), relays
//! inbound messages and reactions to a configured webhook, and exposes
//! `POST /api/send-message` for outbound sends.

use std::{sync::Arc, time::Duration};

use {
    clap::Parser,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    wabridge_gateway::{AppState, WebhookForwarder, start_gateway},
    wabridge_whatsapp::{
        CredsStore, SidecarConfig, SidecarConnector, Supervisor, find_sidecar_dir,
        new_session_slot, start_sidecar,
    },
};

#[derive(Parser)]
#[command(name = "wabridge", about = "wabridge — WhatsApp webhook bridge")]
struct Cli {
    /// Webhook URL inbound events are POSTed to (overrides config and
    /// WEBHOOK_URL).
    #[arg(long)]
    webhook_url: Option<String>,

    /// Address to bind to (overrides config value).
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on (overrides config value).
    #[arg(long)]
    port: Option<u16>,

    /// Path to a config file (default: discover wabridge.toml).
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Directory for persisted credentials.
    #[arg(long, env = "WABRIDGE_AUTH_DIR")]
    auth_dir: Option<std::path::PathBuf>,

    /// Do not spawn the sidecar process; attach to a running one.
    #[arg(long, default_value_t = false)]
    no_sidecar: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "wabridge starting");

    // Config file, then env, then flags.
    let mut config = match &cli.config {
        Some(path) => wabridge_config::load_config(path)?,
        None => wabridge_config::discover_and_load(),
    };
    wabridge_config::apply_env_overrides(&mut config);
    if let Some(url) = cli.webhook_url {
        config.webhook_url = Some(url);
    }
    if let Some(bind) = cli.bind {
        config.gateway.bind = bind;
    }
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    if let Some(dir) = cli.auth_dir {
        config.whatsapp.auth_dir = Some(dir);
    }
    if cli.no_sidecar {
        config.whatsapp.manage_sidecar = false;
    }

    let Some(webhook_url) = config.webhook_url.clone() else {
        error!("WEBHOOK_URL is required (env, config file, or --webhook-url)");
        anyhow::bail!("missing webhook URL");
    };

    let auth_dir = config.whatsapp.auth_dir();

    // Spawn the sidecar unless one is managed externally.
    let mut sidecar_process = None;
    if config.whatsapp.manage_sidecar {
        let sidecar_dir = find_sidecar_dir(config.whatsapp.sidecar_dir.as_deref())?;
        let process = start_sidecar(SidecarConfig {
            sidecar_dir,
            port: config.whatsapp.sidecar_port,
            auth_dir: Some(auth_dir.clone()),
        })
        .await?;
        sidecar_process = Some(process);
    }

    // Wire the connection supervisor.
    let slot = new_session_slot();
    let connector = Arc::new(SidecarConnector::new(config.whatsapp.sidecar_port));
    let forwarder = Arc::new(WebhookForwarder::new(webhook_url));
    let supervisor = Supervisor::new(
        connector,
        Arc::clone(&slot),
        forwarder,
        CredsStore::new(&auth_dir),
    )
    .with_reconnect_delay(Duration::from_millis(config.whatsapp.reconnect_delay_ms));
    tokio::spawn(supervisor.run());

    // Serve HTTP until a termination signal arrives.
    let state = AppState { session: slot };
    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;
    tokio::spawn(async move {
        if let Err(e) = start_gateway(&bind, port, state).await {
            error!(error = %e, "gateway server failed");
        }
    });

    wait_for_shutdown().await;
    info!("shutting down");

    // Immediate exit, no drain; only the sidecar gets a best-effort stop.
    if let Some(mut process) = sidecar_process
        && let Err(e) = process.stop().await
    {
        warn!(error = %e, "failed to stop sidecar process");
    }

    Ok(())
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            },
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
