//! rsipc - Discord RPC command-line client
//!
//! Connects to the desktop app, prints the authenticated user, optionally
//! sends one raw command, and with `--listen` prints dispatch events.

use rsipc::{ClientBuilder, Command, Config};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: rsipc --client-id <id> [--transport auto|ipc|ws] [--ipc-dir <dir>] \
[--origin <url>] [--timeout <secs>] [--debug] [--listen] [COMMAND [ARGS_JSON]]";

fn setup_logging(debug: bool) {
    let filter = if debug {
        "rsipc=debug,info"
    } else {
        "rsipc=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, disconnecting..."),
        _ = terminate => info!("Received SIGTERM, disconnecting..."),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (config, options) = match Config::parse_args() {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            std::process::exit(2);
        }
    };
    setup_logging(config.debug);

    if config.client_id.is_empty() {
        eprintln!("missing client id\n{}", USAGE);
        std::process::exit(2);
    }

    let command = match options.positional.first() {
        Some(name) => Some(name.parse::<Command>()?),
        None => None,
    };
    let args: serde_json::Value = match options.positional.get(1) {
        Some(json) => serde_json::from_str(json)?,
        None => serde_json::json!({}),
    };

    let mut builder = ClientBuilder::new(config);
    if options.listen {
        builder = builder.on_event(|event| match serde_json::to_string(&event.payload) {
            Ok(json) => println!("{} {}", event.event, json),
            Err(e) => warn!("Failed to print {} event: {}", event.event, e),
        });
    }
    let client = builder.connect().await?;

    let user = client.user();
    info!(
        "Connected over {} as {} ({})",
        client.transport_name(),
        user.global_name.as_deref().unwrap_or(&user.username),
        user.id
    );

    if let Some(cmd) = command {
        let payload = client.send(cmd, &args).await?;
        println!("{}", serde_json::to_string_pretty(&payload)?);
    }

    if options.listen {
        tokio::select! {
            _ = shutdown_signal() => {}
            _ = client.closed() => warn!("Desktop app closed the connection"),
        }
    }

    client.close().await?;
    Ok(())
}
